use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};

pub const PAGE_SIZE: u32 = 20;

/// Paged recipe search against an external content provider.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn search(
        &self,
        cuisine: &str,
        dish_type: &str,
        offset: u32,
    ) -> Result<Vec<ProviderRecipe>>;

    fn provider_name(&self) -> &'static str;
}

/// Recipe object as returned by the provider search endpoint. Only the
/// fields the pipeline consumes are modeled; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecipe {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub extended_ingredients: Vec<ProviderIngredient>,
    #[serde(default)]
    pub analyzed_instructions: Vec<ProviderInstructionSet>,
    #[serde(default)]
    pub ready_in_minutes: Option<u32>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub cuisines: Vec<String>,
    #[serde(default)]
    pub dish_types: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub nutrition: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderIngredient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: serde_json::Value,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub original: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderInstructionSet {
    #[serde(default)]
    pub steps: Vec<ProviderStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderStep {
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub ingredients: Vec<NamedRef>,
    #[serde(default)]
    pub equipment: Vec<NamedRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ProviderRecipe>,
}

pub struct RecipeApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl RecipeApiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("souschef/0.1")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl RecipeSource for RecipeApiClient {
    async fn search(
        &self,
        cuisine: &str,
        dish_type: &str,
        offset: u32,
    ) -> Result<Vec<ProviderRecipe>> {
        let response = self
            .client
            .get(format!("{}/complexSearch", self.base_url))
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("number", &PAGE_SIZE.to_string()),
                ("offset", &offset.to_string()),
                ("cuisine", cuisine),
                ("type", dish_type),
                ("addRecipeInformation", "true"),
                ("addRecipeNutrition", "true"),
                ("fillIngredients", "true"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::RecipeApi(format!(
                "search failed: HTTP {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }

    fn provider_name(&self) -> &'static str {
        "spoonacular"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_provider_payload() {
        let json = r#"{
            "id": 715538,
            "title": "Pasta Carbonara",
            "summary": "<b>Rich</b> and creamy.",
            "extendedIngredients": [
                {"name": "spaghetti", "amount": 200, "unit": "g", "original": "200g spaghetti"},
                {"original": "2 eggs"}
            ],
            "analyzedInstructions": [
                {"steps": [
                    {"number": 1, "step": "Cuire les pâtes.", "ingredients": [{"name": "spaghetti"}], "equipment": [{"name": "casserole"}]},
                    {"number": 2, "step": "Mélanger avec les oeufs."}
                ]}
            ],
            "readyInMinutes": 25,
            "servings": 4,
            "cuisines": ["Italian"],
            "dishTypes": ["main course"]
        }"#;

        let recipe: ProviderRecipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.extended_ingredients.len(), 2);
        assert!(recipe.extended_ingredients[1].name.is_empty());
        assert_eq!(recipe.analyzed_instructions[0].steps.len(), 2);
        assert_eq!(recipe.analyzed_instructions[0].steps[0].equipment[0].name, "casserole");
        assert_eq!(recipe.ready_in_minutes, Some(25));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let recipe: ProviderRecipe =
            serde_json::from_str(r#"{"id": 1, "title": "Soup"}"#).unwrap();
        assert!(recipe.extended_ingredients.is_empty());
        assert!(recipe.analyzed_instructions.is_empty());
        assert!(recipe.nutrition.is_none());
    }
}
