use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::db::Catalog;
use crate::error::Result;
use crate::hash::content_hash;
use crate::models::{PendingStep, ProviderKind};
use crate::pipeline::SynthesisReport;
use crate::services::ContentStore;
use crate::tts::SpeechProvider;

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

// Spoken-duration estimate: ~150 words per minute, ~5 characters per word.
const CHARS_PER_MINUTE: f64 = 150.0 * 5.0;
const MIN_AUDIO_SECONDS: u32 = 2;

enum GroupOutcome {
    Cached,
    Generated,
}

pub struct AudioSynthesizer<'a> {
    catalog: &'a dyn Catalog,
    store: &'a dyn ContentStore,
    premium: Option<Arc<dyn SpeechProvider>>,
    standard: Arc<dyn SpeechProvider>,
    language: String,
    quota_limit: i64,
    parallelism: usize,
}

impl<'a> AudioSynthesizer<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        store: &'a dyn ContentStore,
        premium: Option<Arc<dyn SpeechProvider>>,
        standard: Arc<dyn SpeechProvider>,
        language: String,
        quota_limit: i64,
        parallelism: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            premium,
            standard,
            language,
            quota_limit,
            parallelism,
        }
    }

    /// Synthesize audio for clean steps that have none yet. Steps sharing
    /// normalized instruction text are grouped so each distinct instruction
    /// is synthesized at most once per run.
    pub async fn run(&self, batch_size: u32) -> Result<SynthesisReport> {
        self.catalog.ensure_quota_row(self.quota_limit).await?;

        let steps = self.catalog.steps_missing_audio(batch_size).await?;
        if steps.is_empty() {
            tracing::info!("No steps waiting for audio");
            return Ok(SynthesisReport::default());
        }
        tracing::info!("Synthesizing audio for {} steps", steps.len());

        let mut groups: BTreeMap<String, Vec<PendingStep>> = BTreeMap::new();
        for step in steps {
            groups.entry(content_hash(&step.instruction)).or_default().push(step);
        }

        let results: Vec<(String, Result<GroupOutcome>)> = stream::iter(groups)
            .map(|(hash, group)| async move {
                let outcome = self.process_group(&hash, group).await;
                (hash, outcome)
            })
            .buffer_unordered(self.parallelism.max(1))
            .collect()
            .await;

        let mut report = SynthesisReport::default();
        for (hash, outcome) in results {
            match outcome {
                Ok(GroupOutcome::Cached) => report.cached += 1,
                Ok(GroupOutcome::Generated) => report.generated += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("Audio generation failed for {}: {}", &hash[..8], e);
                }
            }
        }

        tracing::info!(
            "Synthesis finished: {} generated, {} cached, {} failed",
            report.generated,
            report.cached,
            report.failed
        );
        Ok(report)
    }

    async fn process_group(&self, hash: &str, group: Vec<PendingStep>) -> Result<GroupOutcome> {
        let instruction = group[0].instruction.trim().to_string();

        // Content-addressed cache: identical instruction text shares one
        // artifact, no synthesis call, no quota movement.
        if let Some(existing) = self.catalog.find_ready_audio(hash).await? {
            for step in &group {
                self.catalog.link_step_audio(step.step_id, existing.id).await?;
            }
            tracing::debug!("Cache hit for {}: {} steps linked", &hash[..8], group.len());
            return Ok(GroupOutcome::Cached);
        }

        let preferred = self.premium.as_deref().unwrap_or(&*self.standard);
        let audio_id = self
            .catalog
            .insert_generating_audio(hash, preferred.kind(), &self.language, preferred.voice_id())
            .await?;

        let outcome: Result<()> = async {
            let (bytes, provider, quality) = self.synthesize(&instruction).await?;
            let url = self
                .store
                .put(&format!("{}.mp3", hash), &bytes, AUDIO_CONTENT_TYPE)
                .await?;
            self.catalog
                .complete_audio(
                    audio_id,
                    &url,
                    provider,
                    quality,
                    estimate_audio_duration(&instruction),
                    bytes.len() as u64,
                )
                .await?;
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => {
                for step in &group {
                    self.catalog.link_step_audio(step.step_id, audio_id).await?;
                }
                Ok(GroupOutcome::Generated)
            }
            Err(e) => {
                self.catalog.fail_audio(audio_id).await?;
                Err(e)
            }
        }
    }

    /// Premium first when configured and within quota, standard otherwise.
    /// The reservation is taken before the premium call and returned when
    /// the call fails, so concurrent groups can never jointly overrun the
    /// ledger limit.
    async fn synthesize(&self, instruction: &str) -> Result<(Vec<u8>, ProviderKind, &'static str)> {
        if let Some(premium) = &self.premium {
            let chars = instruction.chars().count() as i64;
            if self.catalog.try_reserve_quota(chars).await? {
                match premium.synthesize(instruction).await {
                    Ok(bytes) => return Ok((bytes, ProviderKind::Premium, "high")),
                    Err(e) => {
                        tracing::warn!("Premium synthesis failed, falling back: {}", e);
                        self.catalog.release_quota(chars).await?;
                    }
                }
            } else {
                tracing::debug!("Premium quota exhausted, using standard provider");
            }
        }

        let bytes = self.standard.synthesize(instruction).await?;
        Ok((bytes, ProviderKind::Standard, "standard"))
    }
}

fn estimate_audio_duration(instruction: &str) -> u32 {
    let chars = instruction.chars().count() as f64;
    let seconds = (chars / CHARS_PER_MINUTE * 60.0).round() as u32;
    seconds.max(MIN_AUDIO_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteCatalog;
    use crate::error::AppError;
    use crate::models::{AudioStatus, CleanStatus, CorrectedStep, NewCleanRecipe};
    use crate::services::LocalContentStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeVoice {
        kind: ProviderKind,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeVoice {
        fn new(kind: ProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing(kind: ProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechProvider for FakeVoice {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Synthesis("fake provider down".to_string()));
            }
            Ok(text.as_bytes().to_vec())
        }

        fn kind(&self) -> ProviderKind {
            self.kind
        }
    }

    async fn seed_recipe(catalog: &SqliteCatalog, raw_id: i64, instructions: &[&str]) {
        let session = catalog
            .create_session("spoonacular", serde_json::json!({}))
            .await
            .unwrap();
        let raw_recipe_id = catalog
            .insert_raw_recipe(crate::models::NewRawRecipe {
                session_id: session,
                external_id: format!("ext-{raw_id}"),
                title: "Recette test".to_string(),
                description: None,
                ingredients: Vec::new(),
                instructions: Vec::new(),
                cook_time: None,
                servings: None,
                cuisine_type: None,
                tags: Vec::new(),
                nutrition: serde_json::json!({}),
                image_url: None,
                source_url: None,
                hash: format!("hash-{raw_id}"),
            })
            .await
            .unwrap();
        let steps: Vec<CorrectedStep> = instructions
            .iter()
            .map(|text| CorrectedStep {
                instruction: text.to_string(),
                duration: 5,
                temperature: None,
                tools: Vec::new(),
                ingredients: Vec::new(),
                action_type: "cook".to_string(),
                difficulty: 2,
                tips: None,
                warnings: None,
            })
            .collect();
        let recipe = NewCleanRecipe {
            raw_recipe_id,
            title: "Recette test".to_string(),
            description: String::new(),
            ingredients: Vec::new(),
            cook_time: 10,
            prep_time: 10,
            total_time: 20,
            servings: 4,
            difficulty: "facile".to_string(),
            cuisine_type: None,
            tags: Vec::new(),
            nutrition: serde_json::json!({}),
            image_url: None,
            corrected_by: "ai".to_string(),
            validation_score: 1.0,
            status: CleanStatus::Validated,
        };
        catalog.insert_clean_recipe(recipe, &steps).await.unwrap();
    }

    fn synthesizer<'a>(
        catalog: &'a SqliteCatalog,
        store: &'a LocalContentStore,
        premium: Option<Arc<FakeVoice>>,
        standard: Arc<FakeVoice>,
        quota_limit: i64,
    ) -> AudioSynthesizer<'a> {
        AudioSynthesizer::new(
            catalog,
            store,
            premium.map(|p| p as Arc<dyn SpeechProvider>),
            standard as Arc<dyn SpeechProvider>,
            "fr".to_string(),
            quota_limit,
            2,
        )
    }

    #[tokio::test]
    async fn identical_instructions_synthesize_once() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path());

        // Same normalized text, different surface form.
        seed_recipe(&catalog, 1, &["Cuire les pâtes", "  cuire les pâtes "]).await;

        let premium = FakeVoice::new(ProviderKind::Premium);
        let standard = FakeVoice::new(ProviderKind::Standard);
        let report = synthesizer(&catalog, &store, Some(premium.clone()), standard.clone(), 1000)
            .run(100)
            .await
            .unwrap();

        assert_eq!(report.generated, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(premium.calls(), 1);
        assert_eq!(standard.calls(), 0);

        // Both steps now reference the single ready artifact.
        assert!(catalog.steps_missing_audio(100).await.unwrap().is_empty());
        let audio = catalog
            .find_ready_audio(&content_hash("Cuire les pâtes"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(audio.status, AudioStatus::Ready);
        assert_eq!(audio.provider, ProviderKind::Premium);
    }

    #[tokio::test]
    async fn later_batch_reuses_cached_audio() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path());

        seed_recipe(&catalog, 1, &["Hacher les oignons"]).await;
        let premium = FakeVoice::new(ProviderKind::Premium);
        let standard = FakeVoice::new(ProviderKind::Standard);

        let first = synthesizer(&catalog, &store, Some(premium.clone()), standard.clone(), 1000)
            .run(100)
            .await
            .unwrap();
        assert_eq!(first.generated, 1);

        // A second recipe with the same instruction hits the cache.
        seed_recipe(&catalog, 2, &["hacher les oignons"]).await;
        let second = synthesizer(&catalog, &store, Some(premium.clone()), standard.clone(), 1000)
            .run(100)
            .await
            .unwrap();
        assert_eq!(second.cached, 1);
        assert_eq!(second.generated, 0);
        assert_eq!(premium.calls(), 1);
    }

    #[tokio::test]
    async fn quota_exhaustion_falls_back_to_standard() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path());

        catalog.ensure_quota_row(100).await.unwrap();
        assert!(catalog.try_reserve_quota(95).await.unwrap());

        // 10 characters: 95 + 10 > 100, premium must not be used.
        seed_recipe(&catalog, 1, &["abcdefghij"]).await;
        let premium = FakeVoice::new(ProviderKind::Premium);
        let standard = FakeVoice::new(ProviderKind::Standard);
        synthesizer(&catalog, &store, Some(premium.clone()), standard.clone(), 100)
            .run(100)
            .await
            .unwrap();

        assert_eq!(premium.calls(), 0);
        assert_eq!(standard.calls(), 1);
        assert_eq!(catalog.quota_state().await.unwrap().used_chars, 95);
        let audio = catalog
            .find_ready_audio(&content_hash("abcdefghij"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(audio.provider, ProviderKind::Standard);
        assert_eq!(audio.quality, "standard");
    }

    #[tokio::test]
    async fn quota_boundary_exactly_at_limit_is_allowed() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path());

        catalog.ensure_quota_row(100).await.unwrap();
        assert!(catalog.try_reserve_quota(95).await.unwrap());

        // 5 characters: 95 + 5 = 100, premium is allowed.
        seed_recipe(&catalog, 1, &["abcde"]).await;
        let premium = FakeVoice::new(ProviderKind::Premium);
        let standard = FakeVoice::new(ProviderKind::Standard);
        synthesizer(&catalog, &store, Some(premium.clone()), standard.clone(), 100)
            .run(100)
            .await
            .unwrap();

        assert_eq!(premium.calls(), 1);
        assert_eq!(standard.calls(), 0);
        assert_eq!(catalog.quota_state().await.unwrap().used_chars, 100);
    }

    #[tokio::test]
    async fn premium_failure_releases_quota_and_falls_back() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path());

        seed_recipe(&catalog, 1, &["Verser la sauce"]).await;
        let premium = FakeVoice::failing(ProviderKind::Premium);
        let standard = FakeVoice::new(ProviderKind::Standard);
        let report = synthesizer(&catalog, &store, Some(premium.clone()), standard.clone(), 1000)
            .run(100)
            .await
            .unwrap();

        assert_eq!(report.generated, 1);
        assert_eq!(premium.calls(), 1);
        assert_eq!(standard.calls(), 1);
        // The failed premium reservation was returned to the ledger.
        assert_eq!(catalog.quota_state().await.unwrap().used_chars, 0);
    }

    #[tokio::test]
    async fn total_failure_marks_row_failed_and_step_stays_pending() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path());

        seed_recipe(&catalog, 1, &["Fouetter les blancs"]).await;
        let premium = FakeVoice::failing(ProviderKind::Premium);
        let standard = FakeVoice::failing(ProviderKind::Standard);
        let report = synthesizer(&catalog, &store, Some(premium), standard, 1000)
            .run(100)
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.generated, 0);
        assert!(catalog
            .find_ready_audio(&content_hash("Fouetter les blancs"))
            .await
            .unwrap()
            .is_none());

        // The step is picked up again on the next run and can succeed.
        let steps = catalog.steps_missing_audio(100).await.unwrap();
        assert_eq!(steps.len(), 1);
        let premium = FakeVoice::new(ProviderKind::Premium);
        let standard = FakeVoice::new(ProviderKind::Standard);
        let retry = synthesizer(&catalog, &store, Some(premium), standard, 1000)
            .run(100)
            .await
            .unwrap();
        assert_eq!(retry.generated, 1);
    }

    #[test]
    fn duration_estimate_has_two_second_floor() {
        assert_eq!(estimate_audio_duration("ok"), 2);
        // 750 characters per minute: 75 chars is about 6 seconds.
        let text = "x".repeat(75);
        assert_eq!(estimate_audio_duration(&text), 6);
    }
}
