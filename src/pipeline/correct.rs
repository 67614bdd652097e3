use chrono::{Duration, Utc};
use regex::Regex;

use crate::db::Catalog;
use crate::error::Result;
use crate::models::{
    CleanIngredient, CleanStatus, CorrectedStep, NewCleanRecipe, NewCorrectionLog, RawIngredient,
    RawInstruction, RawRecipe,
};
use crate::pipeline::lexicon::Lexicon;
use crate::pipeline::CorrectionReport;

const TITLE_PLACEHOLDER: &str = "Recette sans titre";
const DESCRIPTION_MAX_CHARS: usize = 500;
const DEFAULT_STEP_MINUTES: u32 = 5;
const DEFAULT_PREP_MINUTES: u32 = 15;
const DEFAULT_COOK_MINUTES: u32 = 20;
const DEFAULT_SERVINGS: u32 = 4;

const PREP_ACTIONS: [&str; 4] = ["prep", "mix", "chop", "combine"];
const COOK_ACTIONS: [&str; 4] = ["cook", "bake", "fry", "boil"];

const CORRECTOR_ID: &str = "ai-system";
const TITLE_CONFIDENCE: f64 = 0.8;

/// Everything the correction pass derives from one raw recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedRecipe {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<CleanIngredient>,
    pub steps: Vec<CorrectedStep>,
    pub cook_time: u32,
    pub prep_time: u32,
    pub servings: u32,
    pub difficulty: String,
    pub tags: Vec<String>,
    pub validation_score: f64,
}

/// Deterministic, heuristic normalizer. Holds the lookup tables and the
/// compiled extraction patterns; all methods are pure.
pub struct Corrector {
    lexicon: Lexicon,
    markup_re: Regex,
    time_re: Regex,
    temp_re: Regex,
    quantity_re: Regex,
}

impl Corrector {
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            lexicon,
            markup_re: Regex::new(r"<[^>]*>").expect("valid markup pattern"),
            time_re: Regex::new(r"(?i)(\d+)\s*(min|minute|heure)").expect("valid time pattern"),
            temp_re: Regex::new(r"(\d+)\s*°\s*[CF]?").expect("valid temperature pattern"),
            quantity_re: Regex::new(r"^\d+.*?\s").expect("valid quantity pattern"),
        }
    }

    /// Apply the full normalization to one raw recipe. Same input, same
    /// output: no clocks, no randomness, no hidden state.
    pub fn correct(&self, raw: &RawRecipe) -> CorrectedRecipe {
        let title = self.correct_title(&raw.title);
        let description = self.correct_description(raw.description.as_deref().unwrap_or(""));
        let ingredients = self.correct_ingredients(&raw.ingredients);
        let steps = self.correct_instructions(&raw.instructions);
        let (cook_time, prep_time) = self.estimate_times(&steps, raw.cook_time);
        let difficulty = self.calculate_difficulty(&steps, &ingredients);
        let tags = self.clean_tags(&raw.tags);
        let validation_score =
            self.validation_score(&title, &ingredients, &steps, cook_time, prep_time);

        CorrectedRecipe {
            title,
            description,
            ingredients,
            steps,
            cook_time,
            prep_time,
            servings: raw.servings.unwrap_or(DEFAULT_SERVINGS),
            difficulty,
            tags,
            validation_score,
        }
    }

    fn correct_title(&self, title: &str) -> String {
        let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return TITLE_PLACEHOLDER.to_string();
        }
        let mut chars = collapsed.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => TITLE_PLACEHOLDER.to_string(),
        }
    }

    fn correct_description(&self, description: &str) -> String {
        self.markup_re
            .replace_all(description, "")
            .trim()
            .chars()
            .take(DESCRIPTION_MAX_CHARS)
            .collect()
    }

    fn correct_ingredients(&self, ingredients: &[RawIngredient]) -> Vec<CleanIngredient> {
        ingredients
            .iter()
            .filter(|ing| {
                !ing.name.trim().is_empty()
                    || ing.original.as_deref().is_some_and(|o| !o.trim().is_empty())
            })
            .map(|ing| {
                let original = ing
                    .original
                    .clone()
                    .filter(|o| !o.trim().is_empty())
                    .unwrap_or_else(|| ing.name.clone());
                let name = if ing.name.trim().is_empty() {
                    self.extract_ingredient_name(&original)
                } else {
                    ing.name.clone()
                };
                CleanIngredient {
                    name,
                    amount: normalize_amount(&ing.amount),
                    unit: self.normalize_unit(&ing.unit),
                    original,
                    preparation: ing.preparation.clone(),
                }
            })
            .collect()
    }

    fn correct_instructions(&self, instructions: &[RawInstruction]) -> Vec<CorrectedStep> {
        instructions
            .iter()
            .filter(|inst| !inst.step.trim().is_empty())
            .map(|inst| {
                let instruction = inst.step.trim().to_string();
                CorrectedStep {
                    duration: self.estimate_step_duration(&instruction),
                    temperature: self.extract_temperature(&instruction),
                    tools: self.extract_tools(&instruction),
                    ingredients: inst.ingredients.clone(),
                    action_type: self.classify_action(&instruction),
                    difficulty: self.estimate_step_difficulty(&instruction),
                    tips: self.lookup_advisory(&instruction, &self.lexicon.tips),
                    warnings: self.lookup_advisory(&instruction, &self.lexicon.warnings),
                    instruction,
                }
            })
            .collect()
    }

    fn estimate_step_duration(&self, instruction: &str) -> u32 {
        let lowered = instruction.to_lowercase();
        for (keyword, minutes) in &self.lexicon.duration_keywords {
            if lowered.contains(keyword.as_str()) {
                return *minutes;
            }
        }

        // Explicit "<N> min/heure" mention, hours converted to minutes.
        if let Some(caps) = self.time_re.captures(instruction) {
            if let Ok(value) = caps[1].parse::<u32>() {
                let unit = caps[2].to_lowercase();
                return if unit.contains("heure") { value * 60 } else { value };
            }
        }

        DEFAULT_STEP_MINUTES
    }

    fn extract_temperature(&self, instruction: &str) -> Option<String> {
        self.temp_re
            .captures(instruction)
            .map(|caps| format!("{}°C", &caps[1]))
    }

    fn extract_tools(&self, instruction: &str) -> Vec<String> {
        let lowered = instruction.to_lowercase();
        self.lexicon
            .tools
            .iter()
            .filter(|tool| lowered.contains(tool.as_str()))
            .cloned()
            .collect()
    }

    fn classify_action(&self, instruction: &str) -> String {
        let lowered = instruction.to_lowercase();
        self.lexicon
            .actions
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, action)| action.clone())
            .unwrap_or_else(|| "other".to_string())
    }

    fn estimate_step_difficulty(&self, instruction: &str) -> u8 {
        let lowered = instruction.to_lowercase();
        if self.lexicon.complex_keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return 4;
        }
        if self.lexicon.simple_keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return 1;
        }
        2
    }

    fn lookup_advisory(
        &self,
        instruction: &str,
        table: &std::collections::BTreeMap<String, String>,
    ) -> Option<String> {
        let lowered = instruction.to_lowercase();
        table
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, advisory)| advisory.clone())
    }

    fn estimate_times(&self, steps: &[CorrectedStep], original_cook_time: Option<u32>) -> (u32, u32) {
        let prep: u32 = steps
            .iter()
            .filter(|s| PREP_ACTIONS.contains(&s.action_type.as_str()))
            .map(|s| s.duration)
            .sum();
        let cook: u32 = steps
            .iter()
            .filter(|s| COOK_ACTIONS.contains(&s.action_type.as_str()))
            .map(|s| s.duration)
            .sum();

        let prep = if prep > 0 { prep } else { DEFAULT_PREP_MINUTES };
        let cook = if cook > 0 {
            cook
        } else {
            original_cook_time
                .filter(|&t| t > 0)
                .unwrap_or(DEFAULT_COOK_MINUTES)
        };

        (cook, prep)
    }

    fn calculate_difficulty(
        &self,
        steps: &[CorrectedStep],
        ingredients: &[CleanIngredient],
    ) -> String {
        let complex_ingredients = ingredients
            .iter()
            .filter(|ing| {
                ing.preparation.is_some()
                    || ing.name.contains("frais")
                    || ing.name.contains("maison")
            })
            .count();
        let complex_steps = steps
            .iter()
            .filter(|s| s.difficulty > 3 || s.action_type == "technique")
            .count();

        let complexity = complex_ingredients + complex_steps + steps.len();
        match complexity {
            0..=5 => "facile",
            6..=10 => "moyen",
            _ => "difficile",
        }
        .to_string()
    }

    fn clean_tags(&self, tags: &[String]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        tags.iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| {
                let len = tag.chars().count();
                len > 2 && len < 20
            })
            .filter(|tag| seen.insert(tag.clone()))
            .take(10)
            .collect()
    }

    fn validation_score(
        &self,
        title: &str,
        ingredients: &[CleanIngredient],
        steps: &[CorrectedStep],
        cook_time: u32,
        prep_time: u32,
    ) -> f64 {
        let mut score = 0.0;

        if title.chars().count() > 5 {
            score += 0.2;
        }
        if ingredients.len() >= 3 {
            score += 0.3;
        }
        if steps.len() >= 3 {
            score += 0.3;
        }
        if cook_time > 0 && prep_time > 0 {
            score += 0.1;
        }
        if !steps.is_empty() {
            let total_chars: usize = steps.iter().map(|s| s.instruction.chars().count()).sum();
            if total_chars as f64 / steps.len() as f64 > 30.0 {
                score += 0.1;
            }
        }

        f64::min(score, 1.0)
    }

    fn extract_ingredient_name(&self, original: &str) -> String {
        self.quantity_re.replace(original, "").trim().to_string()
    }

    fn normalize_unit(&self, unit: &str) -> String {
        if unit.is_empty() {
            return String::new();
        }
        self.lexicon
            .units
            .get(&unit.to_lowercase())
            .cloned()
            .unwrap_or_else(|| unit.to_string())
    }
}

fn normalize_amount(amount: &serde_json::Value) -> f64 {
    match amount {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            cleaned.parse().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// Correct a batch of pending raw recipes old enough to be uncontested by
/// manual edits. One malformed recipe never blocks the batch: it is marked
/// rejected and the loop moves on.
pub async fn run_correction(
    catalog: &dyn Catalog,
    corrector: &Corrector,
    batch_size: u32,
    cool_down: Duration,
) -> Result<CorrectionReport> {
    // Rows left in processing by an aborted run are picked up again here;
    // correction runs are not stacked concurrently.
    let reset = catalog.reset_stale_processing().await?;
    if reset > 0 {
        tracing::warn!("Reset {} stranded processing rows to pending", reset);
    }

    let cutoff = Utc::now() - cool_down;
    let batch = catalog.pending_raw_recipes(cutoff, batch_size).await?;

    if batch.is_empty() {
        tracing::info!("No raw recipes ready for correction");
        return Ok(CorrectionReport::default());
    }
    tracing::info!("Correcting {} raw recipes", batch.len());

    let mut report = CorrectionReport::default();
    for raw in batch {
        // Explicit precondition: only a pending row may be corrected.
        if !catalog.claim_raw_recipe(raw.id).await? {
            tracing::debug!("Raw recipe {} no longer pending, skipping", raw.id);
            report.skipped += 1;
            continue;
        }

        match persist_correction(catalog, corrector, &raw).await {
            Ok(title) => {
                tracing::info!("Corrected recipe {}: {}", raw.id, title);
                report.corrected += 1;
            }
            Err(e) => {
                tracing::warn!("Rejecting recipe {} ({}): {}", raw.id, raw.title, e);
                catalog.mark_raw_rejected(raw.id).await?;
                report.rejected += 1;
            }
        }
    }

    tracing::info!(
        "Correction finished: {} corrected, {} rejected, {} skipped",
        report.corrected,
        report.rejected,
        report.skipped
    );
    Ok(report)
}

async fn persist_correction(
    catalog: &dyn Catalog,
    corrector: &Corrector,
    raw: &RawRecipe,
) -> Result<String> {
    let corrected = corrector.correct(raw);

    if corrected.title != raw.title {
        catalog
            .log_correction(NewCorrectionLog {
                recipe_id: raw.id,
                correction_type: "ai".to_string(),
                field: "title".to_string(),
                original_value: raw.title.clone(),
                corrected_value: corrected.title.clone(),
                confidence: TITLE_CONFIDENCE,
                corrector_id: CORRECTOR_ID.to_string(),
            })
            .await?;
    }

    let recipe = NewCleanRecipe {
        raw_recipe_id: raw.id,
        title: corrected.title.clone(),
        description: corrected.description,
        ingredients: corrected.ingredients,
        cook_time: corrected.cook_time,
        prep_time: corrected.prep_time,
        total_time: corrected.cook_time + corrected.prep_time,
        servings: corrected.servings,
        difficulty: corrected.difficulty,
        cuisine_type: raw.cuisine_type.clone(),
        tags: corrected.tags,
        nutrition: raw.nutrition.clone(),
        image_url: raw.image_url.clone(),
        corrected_by: "ai".to_string(),
        validation_score: corrected.validation_score,
        // The score stays advisory: every machine-corrected recipe lands in
        // validated and review tooling filters on the score.
        status: CleanStatus::Validated,
    };
    catalog.insert_clean_recipe(recipe, &corrected.steps).await?;
    catalog.mark_raw_corrected(raw.id).await?;

    Ok(corrected.title)
}
