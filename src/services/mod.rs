pub mod recipe_api;
pub mod storage;

pub use recipe_api::{ProviderRecipe, RecipeApiClient, RecipeSource};
pub use storage::{BucketContentStore, ContentStore, LocalContentStore};
