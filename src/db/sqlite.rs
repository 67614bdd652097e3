use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, OptionalExtension, Row, ToSql};
use tokio_rusqlite::Connection;

use async_trait::async_trait;

use crate::db::schema::SCHEMA;
use crate::db::Catalog;
use crate::error::Result;
use crate::models::{
    AudioStatus, CleanStatus, CorrectedStep, NewCleanRecipe, NewCorrectionLog, NewRawRecipe,
    PendingStep, ProviderKind, QuotaState, RawRecipe, RawStatus, SessionStatus, StepAudio,
};

macro_rules! sql_text_enum {
    ($($t:ty),+ $(,)?) => {$(
        impl ToSql for $t {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl FromSql for $t {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    )+};
}

sql_text_enum!(RawStatus, SessionStatus, CleanStatus, AudioStatus, ProviderKind);

/// SQLite-backed catalog adapter.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    /// In-memory catalog, used by tests.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }
}

#[cfg(test)]
impl SqliteCatalog {
    /// Session row as persisted: status, counters, whether completed_at is set.
    pub(crate) async fn session_snapshot(
        &self,
        id: i64,
    ) -> Result<(SessionStatus, u32, u32, bool)> {
        let snapshot = self
            .conn
            .call(move |conn| {
                let row = conn.query_row(
                    r#"SELECT status, recipes_scraped, errors_count,
                              completed_at IS NOT NULL
                       FROM scraping_sessions WHERE id = ?1"#,
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )?;
                Ok(row)
            })
            .await?;
        Ok(snapshot)
    }

    pub(crate) async fn correction_logs_for(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<NewCorrectionLog>> {
        let logs = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT recipe_id, correction_type, field_corrected,
                              original_value, corrected_value, confidence_score, corrector_id
                       FROM correction_logs WHERE recipe_id = ?1 ORDER BY id ASC"#,
                )?;
                let logs = stmt
                    .query_map(params![recipe_id], |row| {
                        Ok(NewCorrectionLog {
                            recipe_id: row.get(0)?,
                            correction_type: row.get(1)?,
                            field: row.get(2)?,
                            original_value: row.get(3)?,
                            corrected_value: row.get(4)?,
                            confidence: row.get(5)?,
                            corrector_id: row.get(6)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(logs)
            })
            .await?;
        Ok(logs)
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn create_session(&self, provider: &str, config: serde_json::Value) -> Result<i64> {
        let provider = provider.to_string();
        let config = config.to_string();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO scraping_sessions (provider, status, config) VALUES (?1, ?2, ?3)",
                    params![provider, SessionStatus::Running, config],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    async fn finalize_session(
        &self,
        id: i64,
        status: SessionStatus,
        recipes_scraped: u32,
        errors_count: u32,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE scraping_sessions
                       SET status = ?1, completed_at = datetime('now'),
                           recipes_scraped = ?2, errors_count = ?3
                       WHERE id = ?4 AND status = ?5"#,
                    params![status, recipes_scraped, errors_count, id, SessionStatus::Running],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn raw_recipe_exists(&self, hash: &str) -> Result<bool> {
        let hash = hash.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM recipes_raw WHERE hash = ?1",
                    params![hash],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    async fn insert_raw_recipe(&self, recipe: NewRawRecipe) -> Result<i64> {
        let ingredients = serde_json::to_string(&recipe.ingredients)?;
        let instructions = serde_json::to_string(&recipe.instructions)?;
        let tags = serde_json::to_string(&recipe.tags)?;
        let nutrition = recipe.nutrition.to_string();

        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO recipes_raw (
                           scraping_session_id, external_id, title, description,
                           ingredients, instructions, cook_time, servings, cuisine_type,
                           tags, nutrition, image_url, source_url, hash, status
                       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
                    params![
                        recipe.session_id,
                        recipe.external_id,
                        recipe.title,
                        recipe.description,
                        ingredients,
                        instructions,
                        recipe.cook_time,
                        recipe.servings,
                        recipe.cuisine_type,
                        tags,
                        nutrition,
                        recipe.image_url,
                        recipe.source_url,
                        recipe.hash,
                        RawStatus::Pending,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    async fn pending_raw_recipes(&self, cutoff: DateTime<Utc>, limit: u32) -> Result<Vec<RawRecipe>> {
        let cutoff = cutoff.format("%Y-%m-%d %H:%M:%S").to_string();
        let recipes = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, scraping_session_id, external_id, title, description,
                              ingredients, instructions, cook_time, servings, cuisine_type,
                              tags, nutrition, image_url, source_url, hash, status, scraped_at
                       FROM recipes_raw
                       WHERE status = ?1 AND scraped_at <= ?2
                       ORDER BY scraped_at ASC
                       LIMIT ?3"#,
                )?;
                let recipes = stmt
                    .query_map(params![RawStatus::Pending, cutoff, limit], raw_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(recipes)
            })
            .await?;
        Ok(recipes)
    }

    async fn claim_raw_recipe(&self, id: i64) -> Result<bool> {
        let claimed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE recipes_raw SET status = ?1 WHERE id = ?2 AND status = ?3",
                    params![RawStatus::Processing, id, RawStatus::Pending],
                )?;
                Ok(changed == 1)
            })
            .await?;
        Ok(claimed)
    }

    async fn reset_stale_processing(&self) -> Result<u64> {
        let reset = self
            .conn
            .call(|conn| {
                let changed = conn.execute(
                    "UPDATE recipes_raw SET status = ?1 WHERE status = ?2",
                    params![RawStatus::Pending, RawStatus::Processing],
                )?;
                Ok(changed as u64)
            })
            .await?;
        Ok(reset)
    }

    async fn mark_raw_corrected(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE recipes_raw SET status = ?1 WHERE id = ?2 AND status = ?3",
                    params![RawStatus::Corrected, id, RawStatus::Processing],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn mark_raw_rejected(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE recipes_raw SET status = ?1 WHERE id = ?2 AND status IN (?3, ?4)",
                    params![
                        RawStatus::Rejected,
                        id,
                        RawStatus::Pending,
                        RawStatus::Processing
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn insert_clean_recipe(
        &self,
        recipe: NewCleanRecipe,
        steps: &[CorrectedStep],
    ) -> Result<i64> {
        let ingredients = serde_json::to_string(&recipe.ingredients)?;
        let tags = serde_json::to_string(&recipe.tags)?;
        let nutrition = recipe.nutrition.to_string();

        // Pre-serialize the JSON step columns so the blocking closure stays
        // infallible on the serde side.
        let steps: Vec<(CorrectedStep, String, String)> = steps
            .iter()
            .map(|s| {
                Ok((
                    s.clone(),
                    serde_json::to_string(&s.tools)?,
                    serde_json::to_string(&s.ingredients)?,
                ))
            })
            .collect::<Result<_>>()?;

        let id = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    r#"INSERT INTO recipes_clean (
                           raw_recipe_id, title, description, ingredients,
                           cook_time, prep_time, total_time, servings, difficulty,
                           cuisine_type, tags, nutrition, image_url,
                           corrected_by, validation_score, status
                       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"#,
                    params![
                        recipe.raw_recipe_id,
                        recipe.title,
                        recipe.description,
                        ingredients,
                        recipe.cook_time,
                        recipe.prep_time,
                        recipe.total_time,
                        recipe.servings,
                        recipe.difficulty,
                        recipe.cuisine_type,
                        tags,
                        nutrition,
                        recipe.image_url,
                        recipe.corrected_by,
                        recipe.validation_score,
                        recipe.status,
                    ],
                )?;
                let recipe_id = tx.last_insert_rowid();

                for (number, (step, tools, ingredients_used)) in steps.iter().enumerate() {
                    tx.execute(
                        r#"INSERT INTO steps_clean (
                               recipe_id, step_number, instruction, duration_estimate,
                               temperature, tools, ingredients_used, action_type,
                               difficulty_level, tips, warnings
                           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
                        params![
                            recipe_id,
                            number as i64 + 1,
                            step.instruction,
                            step.duration,
                            step.temperature,
                            tools,
                            ingredients_used,
                            step.action_type,
                            step.difficulty,
                            step.tips,
                            step.warnings,
                        ],
                    )?;
                }

                tx.commit()?;
                Ok(recipe_id)
            })
            .await?;
        Ok(id)
    }

    async fn log_correction(&self, entry: NewCorrectionLog) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO correction_logs (
                           recipe_id, correction_type, field_corrected,
                           original_value, corrected_value, confidence_score, corrector_id
                       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        entry.recipe_id,
                        entry.correction_type,
                        entry.field,
                        entry.original_value,
                        entry.corrected_value,
                        entry.confidence,
                        entry.corrector_id,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn steps_missing_audio(&self, limit: u32) -> Result<Vec<PendingStep>> {
        let steps = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT sc.id, sc.instruction
                       FROM steps_clean sc
                       LEFT JOIN steps_audio sa
                           ON sa.id = sc.audio_id AND sa.status = ?1
                       WHERE sa.id IS NULL
                       ORDER BY sc.id ASC
                       LIMIT ?2"#,
                )?;
                let steps = stmt
                    .query_map(params![AudioStatus::Ready, limit], |row| {
                        Ok(PendingStep {
                            step_id: row.get(0)?,
                            instruction: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(steps)
            })
            .await?;
        Ok(steps)
    }

    async fn find_ready_audio(&self, instruction_hash: &str) -> Result<Option<StepAudio>> {
        let hash = instruction_hash.to_string();
        let audio = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, instruction_hash, audio_url, provider, duration_seconds,
                              file_size_bytes, quality, language, voice_id, status
                       FROM steps_audio
                       WHERE instruction_hash = ?1 AND status = ?2
                       LIMIT 1"#,
                )?;
                let audio = stmt
                    .query_row(params![hash, AudioStatus::Ready], audio_from_row)
                    .optional()?;
                Ok(audio)
            })
            .await?;
        Ok(audio)
    }

    async fn insert_generating_audio(
        &self,
        instruction_hash: &str,
        provider: ProviderKind,
        language: &str,
        voice_id: Option<&str>,
    ) -> Result<i64> {
        let hash = instruction_hash.to_string();
        let language = language.to_string();
        let voice_id = voice_id.map(|s| s.to_string());
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO steps_audio (instruction_hash, provider, language, voice_id, status)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    params![hash, provider, language, voice_id, AudioStatus::Generating],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    async fn complete_audio(
        &self,
        id: i64,
        audio_url: &str,
        provider: ProviderKind,
        quality: &str,
        duration_seconds: u32,
        file_size_bytes: u64,
    ) -> Result<()> {
        let audio_url = audio_url.to_string();
        let quality = quality.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE steps_audio
                       SET audio_url = ?1, provider = ?2, quality = ?3,
                           duration_seconds = ?4, file_size_bytes = ?5,
                           status = ?6, generated_at = datetime('now')
                       WHERE id = ?7 AND status = ?8"#,
                    params![
                        audio_url,
                        provider,
                        quality,
                        duration_seconds,
                        file_size_bytes as i64,
                        AudioStatus::Ready,
                        id,
                        AudioStatus::Generating,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn fail_audio(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE steps_audio SET status = ?1 WHERE id = ?2 AND status = ?3",
                    params![AudioStatus::Failed, id, AudioStatus::Generating],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn link_step_audio(&self, step_id: i64, audio_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE steps_clean SET audio_id = ?1 WHERE id = ?2",
                    params![audio_id, step_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn ensure_quota_row(&self, quota_limit: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO audio_quota (quota_limit)
                       SELECT ?1 WHERE NOT EXISTS (SELECT 1 FROM audio_quota)"#,
                    params![quota_limit],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn try_reserve_quota(&self, chars: i64) -> Result<bool> {
        // Single conditional update: the check and the increment are one
        // atomic statement, so concurrent reservations cannot jointly
        // overrun the limit.
        let reserved = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE audio_quota
                       SET used_chars = used_chars + ?1, updated_at = datetime('now')
                       WHERE used_chars + ?1 <= quota_limit"#,
                    params![chars],
                )?;
                Ok(changed == 1)
            })
            .await?;
        Ok(reserved)
    }

    async fn release_quota(&self, chars: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE audio_quota
                       SET used_chars = MAX(0, used_chars - ?1), updated_at = datetime('now')"#,
                    params![chars],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn quota_state(&self) -> Result<QuotaState> {
        let state = self
            .conn
            .call(|conn| {
                let state = conn.query_row(
                    "SELECT used_chars, quota_limit FROM audio_quota LIMIT 1",
                    [],
                    |row| {
                        Ok(QuotaState {
                            used_chars: row.get(0)?,
                            quota_limit: row.get(1)?,
                        })
                    },
                )?;
                Ok(state)
            })
            .await?;
        Ok(state)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 first (e.g. "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g. "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn raw_from_row(row: &Row) -> rusqlite::Result<RawRecipe> {
    // Nested JSON columns fall back to empty collections rather than failing
    // the whole batch on one malformed row.
    let ingredients: String = row.get(5)?;
    let instructions: String = row.get(6)?;
    let tags: String = row.get(10)?;
    let nutrition: String = row.get(11)?;

    Ok(RawRecipe {
        id: row.get(0)?,
        session_id: row.get(1)?,
        external_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        ingredients: serde_json::from_str(&ingredients).unwrap_or_default(),
        instructions: serde_json::from_str(&instructions).unwrap_or_default(),
        cook_time: row.get(7)?,
        servings: row.get(8)?,
        cuisine_type: row.get(9)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        nutrition: serde_json::from_str(&nutrition).unwrap_or(serde_json::Value::Null),
        image_url: row.get(12)?,
        source_url: row.get(13)?,
        hash: row.get(14)?,
        status: row.get(15)?,
        scraped_at: row
            .get::<_, String>(16)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

fn audio_from_row(row: &Row) -> rusqlite::Result<StepAudio> {
    Ok(StepAudio {
        id: row.get(0)?,
        instruction_hash: row.get(1)?,
        audio_url: row.get(2)?,
        provider: row.get(3)?,
        duration_seconds: row.get(4)?,
        file_size_bytes: row.get::<_, Option<i64>>(5)?.map(|n| n as u64),
        quality: row.get(6)?,
        language: row.get(7)?,
        voice_id: row.get(8)?,
        status: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRawRecipe, ProviderKind};

    fn sample_raw(session_id: i64, hash: &str) -> NewRawRecipe {
        NewRawRecipe {
            session_id,
            external_id: "715538".to_string(),
            title: "pasta carbonara".to_string(),
            description: Some("A classic.".to_string()),
            ingredients: Vec::new(),
            instructions: Vec::new(),
            cook_time: Some(25),
            servings: Some(4),
            cuisine_type: Some("italian".to_string()),
            tags: vec!["italian".to_string()],
            nutrition: serde_json::json!({}),
            image_url: None,
            source_url: None,
            hash: hash.to_string(),
        }
    }

    #[tokio::test]
    async fn dedup_by_hash() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let session = catalog
            .create_session("spoonacular", serde_json::json!({}))
            .await
            .unwrap();

        assert!(!catalog.raw_recipe_exists("abc").await.unwrap());
        catalog.insert_raw_recipe(sample_raw(session, "abc")).await.unwrap();
        assert!(catalog.raw_recipe_exists("abc").await.unwrap());

        // Second insert with the same hash violates the unique constraint.
        assert!(catalog.insert_raw_recipe(sample_raw(session, "abc")).await.is_err());
    }

    #[tokio::test]
    async fn claim_is_single_shot() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let session = catalog
            .create_session("spoonacular", serde_json::json!({}))
            .await
            .unwrap();
        let id = catalog.insert_raw_recipe(sample_raw(session, "h1")).await.unwrap();

        assert!(catalog.claim_raw_recipe(id).await.unwrap());
        assert!(!catalog.claim_raw_recipe(id).await.unwrap());

        catalog.mark_raw_corrected(id).await.unwrap();
        // Corrected rows never revert to pending or processing.
        assert!(!catalog.claim_raw_recipe(id).await.unwrap());
    }

    #[tokio::test]
    async fn finalize_session_is_single_shot() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let id = catalog
            .create_session("spoonacular", serde_json::json!({}))
            .await
            .unwrap();

        catalog
            .finalize_session(id, SessionStatus::Completed, 7, 1)
            .await
            .unwrap();
        let (status, scraped, errors, finalized) = catalog.session_snapshot(id).await.unwrap();
        assert_eq!(status, SessionStatus::Completed);
        assert_eq!((scraped, errors), (7, 1));
        assert!(finalized);

        // Only a running session can be finalized; a second call is a no-op.
        catalog
            .finalize_session(id, SessionStatus::Failed, 99, 99)
            .await
            .unwrap();
        let (status, scraped, errors, _) = catalog.session_snapshot(id).await.unwrap();
        assert_eq!(status, SessionStatus::Completed);
        assert_eq!((scraped, errors), (7, 1));
    }

    #[tokio::test]
    async fn quota_reserve_boundary() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        catalog.ensure_quota_row(100).await.unwrap();
        assert!(catalog.try_reserve_quota(95).await.unwrap());

        // 95 + 10 > 100: refused, counter untouched.
        assert!(!catalog.try_reserve_quota(10).await.unwrap());
        assert_eq!(catalog.quota_state().await.unwrap().used_chars, 95);

        // 95 + 5 = 100: exactly at the limit, allowed.
        assert!(catalog.try_reserve_quota(5).await.unwrap());
        assert_eq!(catalog.quota_state().await.unwrap().used_chars, 100);
    }

    #[tokio::test]
    async fn quota_release_floors_at_zero() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        catalog.ensure_quota_row(100).await.unwrap();
        // Idempotent: a second ensure keeps the existing row.
        catalog.ensure_quota_row(500).await.unwrap();
        assert_eq!(catalog.quota_state().await.unwrap().quota_limit, 100);

        assert!(catalog.try_reserve_quota(10).await.unwrap());
        catalog.release_quota(25).await.unwrap();
        assert_eq!(catalog.quota_state().await.unwrap().used_chars, 0);
    }

    #[tokio::test]
    async fn ready_audio_never_reverts() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let id = catalog
            .insert_generating_audio("hash-a", ProviderKind::Premium, "fr", None)
            .await
            .unwrap();
        catalog
            .complete_audio(id, "file:///a.mp3", ProviderKind::Premium, "high", 4, 1024)
            .await
            .unwrap();

        // fail_audio only applies to generating rows.
        catalog.fail_audio(id).await.unwrap();
        let audio = catalog.find_ready_audio("hash-a").await.unwrap().unwrap();
        assert_eq!(audio.status, AudioStatus::Ready);
        assert_eq!(audio.audio_url, "file:///a.mp3");
    }

    #[tokio::test]
    async fn single_ready_row_per_hash() {
        let catalog = SqliteCatalog::open_in_memory().await.unwrap();
        let first = catalog
            .insert_generating_audio("dup", ProviderKind::Premium, "fr", None)
            .await
            .unwrap();
        let second = catalog
            .insert_generating_audio("dup", ProviderKind::Standard, "fr", None)
            .await
            .unwrap();

        catalog
            .complete_audio(first, "file:///1.mp3", ProviderKind::Premium, "high", 3, 10)
            .await
            .unwrap();
        // The partial unique index rejects a second ready row for the hash.
        assert!(catalog
            .complete_audio(second, "file:///2.mp3", ProviderKind::Standard, "standard", 3, 10)
            .await
            .is_err());
    }
}
