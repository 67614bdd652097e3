pub const SCHEMA: &str = r#"
-- scraping sessions: one bounded ingestion run
CREATE TABLE IF NOT EXISTS scraping_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    started_at TEXT NOT NULL DEFAULT (datetime('now')),
    completed_at TEXT,
    status TEXT NOT NULL DEFAULT 'running',
    recipes_scraped INTEGER NOT NULL DEFAULT 0,
    errors_count INTEGER NOT NULL DEFAULT 0,
    config TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- raw recipes as ingested; audit trail, never deleted
CREATE TABLE IF NOT EXISTS recipes_raw (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scraping_session_id INTEGER NOT NULL REFERENCES scraping_sessions(id),
    external_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    ingredients TEXT NOT NULL DEFAULT '[]',
    instructions TEXT NOT NULL DEFAULT '[]',
    cook_time INTEGER,
    servings INTEGER,
    cuisine_type TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    nutrition TEXT NOT NULL DEFAULT '{}',
    image_url TEXT,
    source_url TEXT,
    hash TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'pending',
    scraped_at TEXT NOT NULL DEFAULT (datetime('now')),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_recipes_raw_status ON recipes_raw(status, scraped_at);
CREATE INDEX IF NOT EXISTS idx_recipes_raw_hash ON recipes_raw(hash);

-- clean recipes, derived 1:1 from a raw recipe
CREATE TABLE IF NOT EXISTS recipes_clean (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    raw_recipe_id INTEGER NOT NULL UNIQUE REFERENCES recipes_raw(id),
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    ingredients TEXT NOT NULL DEFAULT '[]',
    cook_time INTEGER NOT NULL DEFAULT 0,
    prep_time INTEGER NOT NULL DEFAULT 0,
    total_time INTEGER NOT NULL DEFAULT 0,
    servings INTEGER NOT NULL DEFAULT 4,
    difficulty TEXT NOT NULL DEFAULT 'moyen',
    cuisine_type TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    nutrition TEXT NOT NULL DEFAULT '{}',
    image_url TEXT,
    corrected_by TEXT NOT NULL DEFAULT 'ai',
    corrected_at TEXT NOT NULL DEFAULT (datetime('now')),
    validation_score REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'validated',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ordered steps of a clean recipe
CREATE TABLE IF NOT EXISTS steps_clean (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipe_id INTEGER NOT NULL REFERENCES recipes_clean(id) ON DELETE CASCADE,
    audio_id INTEGER REFERENCES steps_audio(id),
    step_number INTEGER NOT NULL,
    instruction TEXT NOT NULL,
    duration_estimate INTEGER,
    temperature TEXT,
    tools TEXT NOT NULL DEFAULT '[]',
    ingredients_used TEXT NOT NULL DEFAULT '[]',
    action_type TEXT,
    difficulty_level INTEGER NOT NULL DEFAULT 1,
    tips TEXT,
    warnings TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(recipe_id, step_number)
);

CREATE INDEX IF NOT EXISTS idx_steps_clean_recipe ON steps_clean(recipe_id, step_number);
CREATE INDEX IF NOT EXISTS idx_steps_clean_audio ON steps_clean(audio_id);

-- synthesized audio artifacts, content-addressed by instruction hash
CREATE TABLE IF NOT EXISTS steps_audio (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    instruction_hash TEXT NOT NULL,
    audio_url TEXT NOT NULL DEFAULT '',
    provider TEXT NOT NULL,
    duration_seconds INTEGER,
    file_size_bytes INTEGER,
    quality TEXT NOT NULL DEFAULT 'standard',
    language TEXT NOT NULL DEFAULT 'fr',
    voice_id TEXT,
    status TEXT NOT NULL DEFAULT 'generating',
    generated_at TEXT NOT NULL DEFAULT (datetime('now')),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_steps_audio_hash ON steps_audio(instruction_hash);

-- at most one ready artifact per distinct instruction hash
CREATE UNIQUE INDEX IF NOT EXISTS idx_steps_audio_ready
    ON steps_audio(instruction_hash) WHERE status = 'ready';

-- append-only audit of field corrections
CREATE TABLE IF NOT EXISTS correction_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipe_id INTEGER NOT NULL REFERENCES recipes_raw(id),
    correction_type TEXT NOT NULL,
    field_corrected TEXT NOT NULL,
    original_value TEXT,
    corrected_value TEXT,
    confidence_score REAL,
    corrector_id TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- single-row ledger bounding premium synthesis usage per billing window
CREATE TABLE IF NOT EXISTS audio_quota (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    used_chars INTEGER NOT NULL DEFAULT 0,
    quota_limit INTEGER NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
