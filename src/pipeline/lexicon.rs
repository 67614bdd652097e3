use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Keyword and unit lookup tables driving the heuristic correction pass.
///
/// The built-in tables target French instruction text; deployments can
/// override any of them from a TOML file without code changes.
#[derive(Debug, Clone, Deserialize)]
pub struct Lexicon {
    /// Instruction keyword -> estimated duration in minutes.
    #[serde(default = "default_duration_keywords")]
    pub duration_keywords: BTreeMap<String, u32>,

    /// Instruction keyword -> action category.
    #[serde(default = "default_actions")]
    pub actions: BTreeMap<String, String>,

    /// Unit abbreviation -> canonical unit name.
    #[serde(default = "default_units")]
    pub units: BTreeMap<String, String>,

    /// Tool vocabulary matched by substring.
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,

    /// Keywords marking a technically demanding step.
    #[serde(default = "default_complex_keywords")]
    pub complex_keywords: Vec<String>,

    /// Keywords marking a trivial step.
    #[serde(default = "default_simple_keywords")]
    pub simple_keywords: Vec<String>,

    /// Instruction keyword -> advisory tip.
    #[serde(default = "default_tips")]
    pub tips: BTreeMap<String, String>,

    /// Instruction keyword -> safety warning.
    #[serde(default = "default_warnings")]
    pub warnings: BTreeMap<String, String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            duration_keywords: default_duration_keywords(),
            actions: default_actions(),
            units: default_units(),
            tools: default_tools(),
            complex_keywords: default_complex_keywords(),
            simple_keywords: default_simple_keywords(),
            tips: default_tips(),
            warnings: default_warnings(),
        }
    }
}

impl Lexicon {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn string_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_duration_keywords() -> BTreeMap<String, u32> {
    [
        ("mélanger", 2),
        ("couper", 5),
        ("hacher", 3),
        ("cuire", 15),
        ("faire revenir", 5),
        ("bouillir", 10),
        ("mijoter", 20),
        ("four", 25),
        ("repos", 30),
        ("refroidir", 60),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), *v))
    .collect()
}

fn default_actions() -> BTreeMap<String, String> {
    string_map(&[
        ("couper", "prep"),
        ("hacher", "prep"),
        ("mélanger", "mix"),
        ("cuire", "cook"),
        ("faire revenir", "cook"),
        ("bouillir", "boil"),
        ("four", "bake"),
        ("frire", "fry"),
    ])
}

fn default_units() -> BTreeMap<String, String> {
    string_map(&[
        ("cups", "tasses"),
        ("cup", "tasse"),
        ("tbsp", "cuillères à soupe"),
        ("tsp", "cuillères à café"),
        ("oz", "onces"),
        ("lb", "livres"),
        ("g", "grammes"),
        ("kg", "kilogrammes"),
        ("ml", "millilitres"),
        ("l", "litres"),
    ])
}

fn default_tools() -> Vec<String> {
    string_list(&[
        "poêle", "casserole", "four", "mixeur", "fouet", "couteau", "planche", "bol",
        "saladier", "passoire", "râpe",
    ])
}

fn default_complex_keywords() -> Vec<String> {
    string_list(&["tempérer", "émulsionner", "flamber", "technique"])
}

fn default_simple_keywords() -> Vec<String> {
    string_list(&["mélanger", "ajouter", "verser"])
}

fn default_tips() -> BTreeMap<String, String> {
    string_map(&[
        ("cuire", "Surveillez la cuisson pour éviter que ça brûle"),
        ("mélanger", "Mélangez délicatement pour ne pas casser les ingrédients"),
    ])
}

fn default_warnings() -> BTreeMap<String, String> {
    string_map(&[
        ("huile chaude", "Attention aux projections d'huile chaude"),
        ("four", "Utilisez des gants de cuisine pour manipuler les plats chauds"),
    ])
}
