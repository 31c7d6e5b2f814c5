use rusqlite::Connection;

use crate::error::AppError;

/// Run the consolidated schema migration. Every statement is idempotent.
pub fn run(conn: &Connection) -> Result<(), AppError> {
    tracing::debug!("Running database migrations");

    conn.execute_batch(SCHEMA)?;

    tracing::info!("Database migrations complete");
    Ok(())
}

const SCHEMA: &str = r#"

-- ============================================================================
-- Users
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    plan        TEXT NOT NULL DEFAULT 'free' CHECK (plan IN ('free', 'pro', 'studio')),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- ============================================================================
-- Profiles (target platforms)
-- ============================================================================

CREATE TABLE IF NOT EXISTS profiles (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    platform        TEXT NOT NULL,
    max_length      INTEGER,
    weight_syntax   TEXT NOT NULL DEFAULT 'parenthesized',
    negative_syntax TEXT NOT NULL DEFAULT 'none',
    separator       TEXT NOT NULL DEFAULT ', ',
    is_builtin      INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- ============================================================================
-- Catalog: blocks & filters
-- ============================================================================

CREATE TABLE IF NOT EXISTS blocks (
    key         TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    template    TEXT NOT NULL,
    category    TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_blocks_category ON blocks(category);

CREATE TABLE IF NOT EXISTS filters (
    key         TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    options     TEXT NOT NULL DEFAULT '[]',
    effects     TEXT NOT NULL DEFAULT '{}',
    is_premium  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- ============================================================================
-- Blueprints (versioned)
-- ============================================================================

CREATE TABLE IF NOT EXISTS blueprints (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    description     TEXT,
    category        TEXT,
    owner_user_id   TEXT REFERENCES users(id) ON DELETE CASCADE,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_blueprints_owner ON blueprints(owner_user_id);

CREATE TABLE IF NOT EXISTS blueprint_versions (
    id              TEXT PRIMARY KEY,
    blueprint_id    TEXT NOT NULL REFERENCES blueprints(id) ON DELETE CASCADE,
    version         INTEGER NOT NULL,
    blocks          TEXT NOT NULL DEFAULT '[]',
    constraints     TEXT NOT NULL DEFAULT '[]',
    created_at      TEXT NOT NULL,
    UNIQUE (blueprint_id, version)
);
CREATE INDEX IF NOT EXISTS idx_bpv_blueprint ON blueprint_versions(blueprint_id, version DESC);

-- ============================================================================
-- LoRA models & versions
-- ============================================================================

CREATE TABLE IF NOT EXISTS lora_models (
    id              TEXT PRIMARY KEY,
    owner_user_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name            TEXT NOT NULL,
    model_name      TEXT NOT NULL,
    trigger_word    TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_lora_models_owner ON lora_models(owner_user_id);

CREATE TABLE IF NOT EXISTS lora_versions (
    id              TEXT PRIMARY KEY,
    lora_id         TEXT NOT NULL REFERENCES lora_models(id) ON DELETE CASCADE,
    version         INTEGER NOT NULL,
    status          TEXT NOT NULL DEFAULT 'training' CHECK (status IN ('training', 'ready', 'failed')),
    default_weight  REAL NOT NULL DEFAULT 1.0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (lora_id, version)
);

-- ============================================================================
-- Generated prompts (compile history)
-- ============================================================================

CREATE TABLE IF NOT EXISTS generated_prompts (
    id                  TEXT PRIMARY KEY,
    user_id             TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    profile_id          TEXT NOT NULL,
    blueprint_id        TEXT NOT NULL,
    blueprint_version   INTEGER NOT NULL,
    compiled_prompt     TEXT NOT NULL,
    seed                TEXT NOT NULL,
    score               INTEGER NOT NULL,
    warnings            TEXT NOT NULL DEFAULT '[]',
    metadata            TEXT NOT NULL DEFAULT '{}',
    character_pack      TEXT,
    gem_optimization    TEXT,
    created_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_generated_prompts_user ON generated_prompts(user_id, created_at DESC);

"#;
