mod schema;
mod sqlite;

pub use sqlite::SqliteCatalog;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    CorrectedStep, NewCleanRecipe, NewCorrectionLog, NewRawRecipe, PendingStep, ProviderKind,
    QuotaState, RawRecipe, SessionStatus, StepAudio,
};

/// Narrow query contract over the catalog tables. The pipeline stages are
/// written against this trait so the concrete backend is a swappable
/// adapter rather than duplicated business logic.
#[async_trait]
pub trait Catalog: Send + Sync {
    // Scraping sessions

    async fn create_session(&self, provider: &str, config: serde_json::Value) -> Result<i64>;

    /// Terminal update of a session: status, final counters, completion time.
    async fn finalize_session(
        &self,
        id: i64,
        status: SessionStatus,
        recipes_scraped: u32,
        errors_count: u32,
    ) -> Result<()>;

    // Raw recipes

    async fn raw_recipe_exists(&self, hash: &str) -> Result<bool>;

    async fn insert_raw_recipe(&self, recipe: NewRawRecipe) -> Result<i64>;

    /// Pending rows scraped at or before `cutoff`, oldest first.
    async fn pending_raw_recipes(&self, cutoff: DateTime<Utc>, limit: u32) -> Result<Vec<RawRecipe>>;

    /// Claim a pending row for correction. Returns false when the row is no
    /// longer pending (already claimed, corrected or rejected).
    async fn claim_raw_recipe(&self, id: i64) -> Result<bool>;

    /// Return rows stranded in processing by an aborted run to pending.
    /// Returns how many rows were reset.
    async fn reset_stale_processing(&self) -> Result<u64>;

    async fn mark_raw_corrected(&self, id: i64) -> Result<()>;

    async fn mark_raw_rejected(&self, id: i64) -> Result<()>;

    // Clean recipes and steps

    /// Insert a clean recipe together with its ordered steps, atomically.
    /// Step numbers are assigned 1-based in slice order.
    async fn insert_clean_recipe(
        &self,
        recipe: NewCleanRecipe,
        steps: &[CorrectedStep],
    ) -> Result<i64>;

    async fn log_correction(&self, entry: NewCorrectionLog) -> Result<()>;

    // Step audio

    /// Clean steps with no linked ready audio artifact.
    async fn steps_missing_audio(&self, limit: u32) -> Result<Vec<PendingStep>>;

    async fn find_ready_audio(&self, instruction_hash: &str) -> Result<Option<StepAudio>>;

    async fn insert_generating_audio(
        &self,
        instruction_hash: &str,
        provider: ProviderKind,
        language: &str,
        voice_id: Option<&str>,
    ) -> Result<i64>;

    /// Transition generating -> ready with the artifact metadata.
    async fn complete_audio(
        &self,
        id: i64,
        audio_url: &str,
        provider: ProviderKind,
        quality: &str,
        duration_seconds: u32,
        file_size_bytes: u64,
    ) -> Result<()>;

    /// Transition generating -> failed. Ready rows are never touched.
    async fn fail_audio(&self, id: i64) -> Result<()>;

    async fn link_step_audio(&self, step_id: i64, audio_id: i64) -> Result<()>;

    // Quota ledger

    /// Create the ledger row with the given limit if none exists yet.
    async fn ensure_quota_row(&self, quota_limit: i64) -> Result<()>;

    /// Atomically reserve `chars` against the ledger. Succeeds and persists
    /// the increment only when the post-increment value stays within the
    /// limit; otherwise the counter is untouched and false is returned.
    async fn try_reserve_quota(&self, chars: i64) -> Result<bool>;

    /// Return a reservation after a failed premium call, floored at zero.
    async fn release_quota(&self, chars: i64) -> Result<()>;

    async fn quota_state(&self) -> Result<QuotaState>;
}
