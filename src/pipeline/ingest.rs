use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::db::Catalog;
use crate::error::Result;
use crate::hash::recipe_hash;
use crate::models::{NewRawRecipe, RawIngredient, RawInstruction, SessionStatus};
use crate::pipeline::IngestReport;
use crate::services::{ProviderRecipe, RecipeSource};

/// Give up after this many back-to-back page failures; a dead provider
/// should fail the session instead of spinning on ever-larger offsets.
const MAX_CONSECUTIVE_PAGE_FAILURES: u32 = 5;

pub struct IngestOptions {
    pub target_count: u32,
    pub daily_quota: u32,
    pub request_delay: Duration,
    pub cuisines: Vec<String>,
    pub dish_types: Vec<String>,
    pub page_size: u32,
}

#[derive(Default)]
struct Counters {
    scraped: u32,
    errors: u32,
}

/// One bounded ingestion run. Creates a scraping session, pages through the
/// provider rotating category filters, and stores new raw recipes. The
/// session is finalized exactly once on every exit path.
pub async fn run_ingestion(
    catalog: &dyn Catalog,
    source: &dyn RecipeSource,
    opts: &IngestOptions,
) -> Result<IngestReport> {
    let session_config = serde_json::json!({ "target_count": opts.target_count });
    let session_id = catalog
        .create_session(source.provider_name(), session_config)
        .await?;
    tracing::info!(
        "Ingestion session {} started, target {} recipes",
        session_id,
        opts.target_count
    );

    let mut counters = Counters::default();
    let outcome = collect(catalog, source, opts, session_id, &mut counters).await;

    let status = if outcome.is_ok() {
        SessionStatus::Completed
    } else {
        SessionStatus::Failed
    };
    catalog
        .finalize_session(session_id, status, counters.scraped, counters.errors)
        .await?;

    tracing::info!(
        "Ingestion session {} {}: {} recipes, {} errors",
        session_id,
        status,
        counters.scraped,
        counters.errors
    );
    outcome?;

    Ok(IngestReport {
        session_id,
        scraped: counters.scraped,
        errors: counters.errors,
    })
}

async fn collect(
    catalog: &dyn Catalog,
    source: &dyn RecipeSource,
    opts: &IngestOptions,
    session_id: i64,
    counters: &mut Counters,
) -> Result<()> {
    if opts.cuisines.is_empty() || opts.dish_types.is_empty() {
        return Err(crate::error::AppError::Config(
            "cuisine and dish type filter lists must not be empty".to_string(),
        ));
    }

    let mut page: u32 = 0;
    let mut consecutive_failures: u32 = 0;

    while counters.scraped < opts.target_count && counters.scraped < opts.daily_quota {
        // Rotate through the cuisine x dish-type grid for content diversity.
        let cuisine = &opts.cuisines[page as usize % opts.cuisines.len()];
        let dish_type =
            &opts.dish_types[(page as usize / opts.cuisines.len()) % opts.dish_types.len()];
        let offset = page * opts.page_size;

        match source.search(cuisine, dish_type, offset).await {
            Ok(recipes) => {
                consecutive_failures = 0;
                if recipes.is_empty() {
                    tracing::info!("Empty page at offset {}, stopping", offset);
                    break;
                }

                for recipe in recipes {
                    if counters.scraped >= opts.target_count
                        || counters.scraped >= opts.daily_quota
                    {
                        break;
                    }

                    match store_recipe(catalog, session_id, &recipe).await {
                        Ok(true) => {
                            counters.scraped += 1;
                            tracing::info!(
                                "Stored recipe {}/{}: {}",
                                counters.scraped,
                                opts.target_count,
                                recipe.title
                            );
                        }
                        Ok(false) => {
                            tracing::debug!("Recipe already ingested: {}", recipe.title);
                        }
                        Err(e) => {
                            counters.errors += 1;
                            tracing::warn!("Failed to store recipe {}: {}", recipe.id, e);
                        }
                    }

                    tokio::time::sleep(opts.request_delay).await;
                }
            }
            Err(e) => {
                counters.errors += 1;
                consecutive_failures += 1;
                tracing::warn!("Page fetch failed at offset {}: {}", offset, e);
                if consecutive_failures >= MAX_CONSECUTIVE_PAGE_FAILURES {
                    return Err(anyhow::anyhow!(
                        "provider unreachable: {} consecutive page failures",
                        consecutive_failures
                    )
                    .into());
                }
            }
        }

        page += 1;
    }

    Ok(())
}

/// Map a provider item into a raw record and insert it, unless its content
/// hash already exists. Returns whether a new row was stored.
async fn store_recipe(
    catalog: &dyn Catalog,
    session_id: i64,
    recipe: &ProviderRecipe,
) -> Result<bool> {
    let hash = recipe_hash(&recipe.id.to_string(), &recipe.title);
    if catalog.raw_recipe_exists(&hash).await? {
        return Ok(false);
    }

    let ingredients = recipe
        .extended_ingredients
        .iter()
        .map(|ing| RawIngredient {
            name: ing.name.clone(),
            amount: ing.amount.clone(),
            unit: ing.unit.clone(),
            original: ing.original.clone(),
            preparation: None,
        })
        .collect();

    let instructions = recipe
        .analyzed_instructions
        .first()
        .map(|set| {
            set.steps
                .iter()
                .map(|step| RawInstruction {
                    number: step.number,
                    step: step.step.clone(),
                    ingredients: step.ingredients.iter().map(|i| i.name.clone()).collect(),
                    equipment: step.equipment.iter().map(|e| e.name.clone()).collect(),
                })
                .collect()
        })
        .unwrap_or_default();

    let tags: Vec<String> = recipe
        .cuisines
        .iter()
        .chain(recipe.dish_types.iter())
        .map(|t| t.to_lowercase())
        .collect();

    catalog
        .insert_raw_recipe(NewRawRecipe {
            session_id,
            external_id: recipe.id.to_string(),
            title: recipe.title.clone(),
            description: Some(strip_markup(&recipe.summary)),
            ingredients,
            instructions,
            cook_time: recipe.ready_in_minutes,
            servings: recipe.servings,
            cuisine_type: recipe.cuisines.first().map(|c| c.to_lowercase()),
            tags,
            nutrition: recipe.nutrition.clone().unwrap_or(serde_json::json!({})),
            image_url: recipe.image.clone(),
            source_url: recipe.source_url.clone(),
            hash,
        })
        .await?;

    Ok(true)
}

fn strip_markup(html: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid markup pattern"));
    re.replace_all(html, "").trim().to_string()
}
