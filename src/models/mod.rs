use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown status value: {0}")]
pub struct ParseStatusError(pub String);

macro_rules! status_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseStatusError(other.to_string())),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum!(RawStatus {
    Pending => "pending",
    Processing => "processing",
    Corrected => "corrected",
    Rejected => "rejected",
});

status_enum!(SessionStatus {
    Running => "running",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

status_enum!(CleanStatus {
    Validated => "validated",
    Published => "published",
    Archived => "archived",
});

status_enum!(AudioStatus {
    Generating => "generating",
    Ready => "ready",
    Failed => "failed",
});

status_enum!(ProviderKind {
    Premium => "premium",
    Standard => "standard",
    Local => "local",
});

/// Ingredient as delivered by the content provider. Amounts arrive as
/// numbers or free-form strings depending on the source, so the raw value
/// is kept as-is until correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIngredient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: serde_json::Value,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub preparation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInstruction {
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RawRecipe {
    pub id: i64,
    pub session_id: i64,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<RawIngredient>,
    pub instructions: Vec<RawInstruction>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub cuisine_type: Option<String>,
    pub tags: Vec<String>,
    pub nutrition: serde_json::Value,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub hash: String,
    pub status: RawStatus,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRawRecipe {
    pub session_id: i64,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<RawIngredient>,
    pub instructions: Vec<RawInstruction>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub cuisine_type: Option<String>,
    pub tags: Vec<String>,
    pub nutrition: serde_json::Value,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub hash: String,
}

/// Ingredient after correction: numeric amount, canonical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanIngredient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
    pub original: String,
    pub preparation: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCleanRecipe {
    pub raw_recipe_id: i64,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<CleanIngredient>,
    pub cook_time: u32,
    pub prep_time: u32,
    pub total_time: u32,
    pub servings: u32,
    pub difficulty: String,
    pub cuisine_type: Option<String>,
    pub tags: Vec<String>,
    pub nutrition: serde_json::Value,
    pub image_url: Option<String>,
    pub corrected_by: String,
    pub validation_score: f64,
    pub status: CleanStatus,
}

/// One corrected instruction, persisted as a steps_clean row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedStep {
    pub instruction: String,
    pub duration: u32,
    pub temperature: Option<String>,
    pub tools: Vec<String>,
    pub ingredients: Vec<String>,
    pub action_type: String,
    pub difficulty: u8,
    pub tips: Option<String>,
    pub warnings: Option<String>,
}

/// A clean step still waiting for ready audio.
#[derive(Debug, Clone)]
pub struct PendingStep {
    pub step_id: i64,
    pub instruction: String,
}

#[derive(Debug, Clone)]
pub struct StepAudio {
    pub id: i64,
    pub instruction_hash: String,
    pub audio_url: String,
    pub provider: ProviderKind,
    pub duration_seconds: Option<u32>,
    pub file_size_bytes: Option<u64>,
    pub quality: String,
    pub language: String,
    pub voice_id: Option<String>,
    pub status: AudioStatus,
}

#[derive(Debug, Clone)]
pub struct NewCorrectionLog {
    pub recipe_id: i64,
    pub correction_type: String,
    pub field: String,
    pub original_value: String,
    pub corrected_value: String,
    pub confidence: f64,
    pub corrector_id: String,
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaState {
    pub used_chars: i64,
    pub quota_limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in ["pending", "processing", "corrected", "rejected"] {
            assert_eq!(s.parse::<RawStatus>().unwrap().as_str(), s);
        }
        for s in ["generating", "ready", "failed"] {
            assert_eq!(s.parse::<AudioStatus>().unwrap().as_str(), s);
        }
        assert!("archived".parse::<CleanStatus>().is_ok());
        assert!("bogus".parse::<RawStatus>().is_err());
    }

    #[test]
    fn raw_ingredient_tolerates_missing_fields() {
        let ing: RawIngredient = serde_json::from_str(r#"{"original": "2 cups flour"}"#).unwrap();
        assert!(ing.name.is_empty());
        assert!(ing.amount.is_null());
        assert_eq!(ing.original.as_deref(), Some("2 cups flour"));
    }
}
