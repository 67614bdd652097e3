mod correct;
mod ingest;
mod lexicon;
mod synthesize;

pub use correct::{run_correction, Corrector};
pub use ingest::{run_ingestion, IngestOptions};
pub use lexicon::Lexicon;
pub use synthesize::AudioSynthesizer;

/// Outcome of one ingestion session.
#[derive(Debug, Clone, Copy)]
pub struct IngestReport {
    pub session_id: i64,
    pub scraped: u32,
    pub errors: u32,
}

/// Outcome of one correction batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrectionReport {
    pub corrected: u32,
    pub rejected: u32,
    pub skipped: u32,
}

/// Outcome of one synthesis batch, counted per distinct instruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthesisReport {
    pub generated: u32,
    pub cached: u32,
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Catalog, SqliteCatalog};
    use crate::error::Result;
    use crate::models::ProviderKind;
    use crate::services::{LocalContentStore, ProviderRecipe, RecipeSource};
    use crate::tts::SpeechProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct OnePageSource {
        pages_served: AtomicUsize,
    }

    #[async_trait]
    impl RecipeSource for OnePageSource {
        async fn search(&self, _c: &str, _d: &str, _offset: u32) -> Result<Vec<ProviderRecipe>> {
            if self.pages_served.fetch_add(1, Ordering::SeqCst) > 0 {
                return Ok(Vec::new());
            }
            let recipe = serde_json::from_value(serde_json::json!({
                "id": 715538,
                "title": "pasta  carbonara",
                "summary": "<p>Un classique romain.</p>",
                "cuisines": ["Italian"],
                "dishTypes": ["main course"],
                "readyInMinutes": 25,
                "servings": 4,
                "extendedIngredients": [
                    {"name": "spaghetti", "amount": 400.0, "unit": "g", "original": "400 g spaghetti"},
                    {"name": "oeufs", "amount": 3.0, "unit": "", "original": "3 oeufs"}
                ],
                "analyzedInstructions": [{"steps": [
                    {"number": 1, "step": "Cuire les pâtes dans l'eau bouillante."},
                    {"number": 2, "step": "Mélanger les oeufs avec le fromage."}
                ]}]
            }))
            .unwrap();
            Ok(vec![recipe])
        }

        fn provider_name(&self) -> &'static str {
            "fixture"
        }
    }

    struct CountingVoice {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechProvider for CountingVoice {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.as_bytes().to_vec())
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Premium
        }
    }

    /// Full pass through the three stages against one recipe fixture.
    #[tokio::test]
    async fn ingest_correct_synthesize_end_to_end() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();

        let source = OnePageSource {
            pages_served: AtomicUsize::new(0),
        };
        let ingested = run_ingestion(
            &catalog,
            &source,
            &IngestOptions {
                target_count: 10,
                daily_quota: 400,
                request_delay: Duration::from_millis(0),
                cuisines: vec!["italian".to_string()],
                dish_types: vec!["main course".to_string()],
                page_size: 20,
            },
        )
        .await
        .unwrap();
        assert_eq!(ingested.scraped, 1);
        assert_eq!(ingested.errors, 0);

        let corrector = Corrector::new(Lexicon::default());
        let corrected = run_correction(&catalog, &corrector, 50, chrono::Duration::hours(0))
            .await
            .unwrap();
        assert_eq!(corrected.corrected, 1);
        assert_eq!(corrected.rejected, 0);

        let pending = catalog.steps_missing_audio(100).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].instruction.starts_with("Cuire les pâtes"));
        assert!(pending[1].instruction.starts_with("Mélanger les oeufs"));

        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path());
        let premium = Arc::new(CountingVoice {
            calls: AtomicUsize::new(0),
        });
        let standard = Arc::new(CountingVoice {
            calls: AtomicUsize::new(0),
        });
        let synthesizer = AudioSynthesizer::new(
            &catalog,
            &store,
            Some(premium.clone() as Arc<dyn SpeechProvider>),
            standard as Arc<dyn SpeechProvider>,
            "fr".to_string(),
            100_000,
            2,
        );
        let synthesized = synthesizer.run(100).await.unwrap();
        assert_eq!(synthesized.generated, 2);
        assert_eq!(synthesized.failed, 0);
        assert_eq!(premium.calls.load(Ordering::SeqCst), 2);

        // Every step now carries ready audio; a second run is a no-op.
        assert!(catalog.steps_missing_audio(100).await.unwrap().is_empty());
    }
}
