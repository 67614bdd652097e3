use std::sync::Arc;
use std::time::Duration;

mod config;
mod db;
mod error;
mod hash;
mod models;
mod pipeline;
mod services;
mod tts;

use config::Config;
use db::SqliteCatalog;
use error::{AppError, Result};
use pipeline::{run_correction, run_ingestion, AudioSynthesizer, Corrector, IngestOptions, Lexicon};
use services::{recipe_api, BucketContentStore, ContentStore, LocalContentStore, RecipeApiClient};
use tts::{PremiumVoiceClient, SpeechProvider, StandardVoiceClient};

const USAGE: &str = "Usage: souschef <command> [options]

Commands:
  ingest        Scrape new recipes from the provider into the raw catalog
  correct       Normalize pending raw recipes into clean recipes
  synthesize    Generate step audio for clean recipes

Options:
  --target N        Recipes to scrape this session (ingest)
  --batch-size N    Rows to process this run (correct, synthesize)";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info level by default, RUST_LOG overrides)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let config = Config::load()?;
    let catalog = SqliteCatalog::open(&config.db_path).await?;

    match command.as_str() {
        "ingest" => ingest(&catalog, &config, &args).await,
        "correct" => correct(&catalog, &config, &args).await,
        "synthesize" => synthesize(&catalog, &config, &args).await,
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }
}

async fn ingest(catalog: &SqliteCatalog, config: &Config, args: &[String]) -> Result<()> {
    let api_key = config
        .recipe_api_key
        .clone()
        .ok_or_else(|| AppError::Config("recipe_api_key is not set".to_string()))?;

    let target_count = flag_value(args, "--target")?.unwrap_or(config.daily_quota);
    let source = RecipeApiClient::new(api_key, config.recipe_api_url.clone());

    let report = run_ingestion(
        catalog,
        &source,
        &IngestOptions {
            target_count,
            daily_quota: config.daily_quota,
            request_delay: Duration::from_millis(config.request_delay_ms),
            cuisines: config.cuisines.clone(),
            dish_types: config.dish_types.clone(),
            page_size: recipe_api::PAGE_SIZE,
        },
    )
    .await?;

    println!(
        "Session {}: {} recipes stored, {} errors",
        report.session_id, report.scraped, report.errors
    );
    Ok(())
}

async fn correct(catalog: &SqliteCatalog, config: &Config, args: &[String]) -> Result<()> {
    let batch_size = flag_value(args, "--batch-size")?.unwrap_or(config.correction_batch_size);
    let lexicon = match &config.lexicon_path {
        Some(path) => Lexicon::load(path)?,
        None => Lexicon::default(),
    };
    let corrector = Corrector::new(lexicon);
    let cool_down = chrono::Duration::hours(config.cool_down_hours as i64);

    let report = run_correction(catalog, &corrector, batch_size, cool_down).await?;
    println!(
        "{} corrected, {} rejected, {} skipped",
        report.corrected, report.rejected, report.skipped
    );
    Ok(())
}

async fn synthesize(catalog: &SqliteCatalog, config: &Config, args: &[String]) -> Result<()> {
    let batch_size = flag_value(args, "--batch-size")?.unwrap_or(config.synthesis_batch_size);

    let store: Box<dyn ContentStore> = match (
        &config.bucket_endpoint,
        &config.bucket_access_key,
        &config.bucket_name,
    ) {
        (Some(endpoint), Some(access_key), Some(bucket)) => Box::new(BucketContentStore::new(
            endpoint.clone(),
            access_key.clone(),
            bucket.clone(),
            config.bucket_public_url.clone(),
        )),
        _ => Box::new(LocalContentStore::new(config.audio_dir.clone())),
    };

    let premium: Option<Arc<dyn SpeechProvider>> = config.premium_api_key.clone().map(|key| {
        Arc::new(PremiumVoiceClient::new(key, config.premium_voice_id.clone()))
            as Arc<dyn SpeechProvider>
    });
    if premium.is_none() {
        tracing::warn!("No premium API key configured, using standard voice only");
    }
    let standard: Arc<dyn SpeechProvider> =
        Arc::new(StandardVoiceClient::new(config.standard_voice.clone()));

    let synthesizer = AudioSynthesizer::new(
        catalog,
        store.as_ref(),
        premium,
        standard,
        config.language.clone(),
        config.audio_quota_limit,
        config.synthesis_parallelism,
    );

    let report = synthesizer.run(batch_size).await?;
    println!(
        "{} generated, {} cached, {} failed",
        report.generated, report.cached, report.failed
    );
    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Result<Option<u32>> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let value = args
        .get(pos + 1)
        .ok_or_else(|| AppError::Config(format!("{} requires a value", flag)))?;
    value
        .parse()
        .map(Some)
        .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", flag, value)))
}
