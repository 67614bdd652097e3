use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    // External recipe provider
    pub recipe_api_key: Option<String>,
    #[serde(default = "default_recipe_api_url")]
    pub recipe_api_url: String,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_daily_quota")]
    pub daily_quota: u32,
    #[serde(default = "default_cuisines")]
    pub cuisines: Vec<String>,
    #[serde(default = "default_dish_types")]
    pub dish_types: Vec<String>,

    // Correction
    #[serde(default = "default_correction_batch_size")]
    pub correction_batch_size: u32,
    #[serde(default = "default_cool_down_hours")]
    pub cool_down_hours: u32,
    /// Optional TOML file overriding the built-in keyword/unit tables.
    pub lexicon_path: Option<String>,

    // Audio synthesis
    pub premium_api_key: Option<String>,
    #[serde(default = "default_premium_voice_id")]
    pub premium_voice_id: String,
    #[serde(default = "default_standard_voice")]
    pub standard_voice: String,
    #[serde(default = "default_audio_quota_limit")]
    pub audio_quota_limit: i64,
    #[serde(default = "default_synthesis_batch_size")]
    pub synthesis_batch_size: u32,
    #[serde(default = "default_synthesis_parallelism")]
    pub synthesis_parallelism: usize,
    #[serde(default = "default_language")]
    pub language: String,

    // Content store: bucket when endpoint + key are set, local dir otherwise
    pub bucket_endpoint: Option<String>,
    pub bucket_access_key: Option<String>,
    pub bucket_name: Option<String>,
    /// Public base for uploaded audio URLs; defaults to the bucket's
    /// r2.dev host when unset.
    pub bucket_public_url: Option<String>,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("souschef");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("catalog.db").to_string_lossy().to_string()
}

fn default_recipe_api_url() -> String {
    "https://api.spoonacular.com/recipes".to_string()
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_daily_quota() -> u32 {
    400
}

fn default_cuisines() -> Vec<String> {
    ["italian", "french", "mexican", "asian", "american", "mediterranean"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_dish_types() -> Vec<String> {
    ["main course", "dessert", "appetizer", "soup", "salad"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_correction_batch_size() -> u32 {
    50
}

fn default_cool_down_hours() -> u32 {
    48
}

fn default_premium_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_standard_voice() -> String {
    "Celine".to_string()
}

fn default_audio_quota_limit() -> i64 {
    100_000
}

fn default_synthesis_batch_size() -> u32 {
    100
}

fn default_synthesis_parallelism() -> usize {
    4
}

fn default_language() -> String {
    "fr".to_string()
}

fn default_audio_dir() -> String {
    "/var/audio/steps".to_string()
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str("").expect("empty config must deserialize from defaults")
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        // Secrets may come from the environment instead of the config file.
        if let Ok(key) = std::env::var("RECIPE_API_KEY") {
            config.recipe_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("PREMIUM_TTS_API_KEY") {
            config.premium_api_key = Some(key);
        }
        if let Ok(path) = std::env::var("SOUSCHEF_DB") {
            config.db_path = path;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SOUSCHEF_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("souschef")
            .join("config.toml")
    }
}
