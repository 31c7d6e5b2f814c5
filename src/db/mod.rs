#[macro_use]
pub mod macros;
pub mod migrations;
pub mod models;
pub mod repos;

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::engine::platform_rules::builtin_profiles;
use crate::error::AppError;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Connection customizer that sets per-connection SQLite pragmas.
#[derive(Debug)]
struct SqlitePragmaCustomizer;

impl CustomizeConnection<rusqlite::Connection, rusqlite::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -8000;",
        )?;
        Ok(())
    }
}

/// Initialize the database: create file, enable WAL + foreign keys, run migrations, seed the catalog.
pub fn init_db(data_dir: &Path) -> Result<DbPool, AppError> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("vectra.db");

    tracing::info!(path = %db_path.display(), "Initializing database");

    let manager = SqliteConnectionManager::file(&db_path);
    let pool = Pool::builder()
        .max_size(8)
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    // WAL is database-wide, only needs to run once
    {
        let conn = pool.get()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        tracing::debug!("SQLite pragmas configured (WAL, FK, busy_timeout)");
    }

    {
        let conn = pool.get()?;
        migrations::run(&conn)?;
        seed_catalog(&conn)?;
    }

    tracing::info!("Database initialized successfully");
    Ok(pool)
}

// ============================================================================
// Builtin catalog
// ============================================================================

fn seed_catalog(conn: &rusqlite::Connection) -> Result<(), AppError> {
    seed_profiles(conn)?;
    seed_blocks(conn)?;
    seed_filters(conn)?;
    seed_blueprints(conn)?;
    tracing::debug!("Builtin catalog seeded");
    Ok(())
}

fn seed_profiles(conn: &rusqlite::Connection) -> Result<(), AppError> {
    for p in builtin_profiles() {
        conn.execute(
            "INSERT OR IGNORE INTO profiles
             (id, name, platform, max_length, weight_syntax, negative_syntax, separator, is_builtin, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
            params![
                p.id,
                p.name,
                p.platform,
                p.max_length,
                p.weight_syntax.as_str(),
                p.negative_syntax.as_str(),
                p.separator,
                p.created_at,
            ],
        )?;
    }
    Ok(())
}

fn seed_blocks(conn: &rusqlite::Connection) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let blocks = [
        ("portrait_subject", "Portrait subject", "portrait of {{subject}}", "subject"),
        ("scene_context", "Scene context", "{{context}}", "subject"),
        ("featured_items", "Featured items", "featuring {{items}}", "subject"),
        ("scene_environment", "Environment", "set in {{environment}}", "environment"),
        ("lighting_soft", "Soft lighting", "soft ambient light", "lighting"),
        ("lighting_golden", "Golden hour", "warm golden hour light", "lighting"),
        ("camera_wide", "Wide angle", "wide angle shot", "camera"),
        ("camera_closeup", "Close-up", "tight close-up, shallow depth of field", "camera"),
        ("quality_high", "High detail", "highly detailed, sharp focus", "quality"),
    ];

    for (key, name, template, category) in &blocks {
        conn.execute(
            "INSERT OR IGNORE INTO blocks (key, name, template, category, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![key, name, template, category, now],
        )?;
    }
    Ok(())
}

fn seed_filters(conn: &rusqlite::Connection) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let filters = [
        (
            "color",
            "Color palette",
            r#"["neon","pastel","monochrome"]"#,
            r#"{"neon":{"text":"neon accents"},"pastel":{"text":"pastel palette","weight":1.1},"monochrome":{"text":"black and white"}}"#,
            false,
        ),
        (
            "lighting",
            "Lighting",
            r#"["soft","hard","rim"]"#,
            r#"{"soft":{"text":"diffused light"},"hard":{"text":"hard directional light","weight":1.2},"rim":{"text":"rim lighting"}}"#,
            false,
        ),
        (
            "mood",
            "Mood",
            r#"["dreamy","moody","none"]"#,
            r#"{"dreamy":{"text":"dreamy atmosphere"},"moody":{"text":"moody, low key"},"none":{"text":""}}"#,
            false,
        ),
        (
            "style_pack",
            "Style pack",
            r#"["editorial","anime_cel"]"#,
            r#"{"editorial":{"text":"high fashion editorial style","weight":1.3},"anime_cel":{"text":"cel shaded anime style","weight":1.2}}"#,
            true,
        ),
    ];

    for (key, name, options, effects, is_premium) in &filters {
        conn.execute(
            "INSERT OR IGNORE INTO filters (key, name, options, effects, is_premium, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![key, name, options, effects, *is_premium as i32, now],
        )?;
    }
    Ok(())
}

fn seed_blueprints(conn: &rusqlite::Connection) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let blueprints = [
        (
            "bp-cinematic-portrait",
            "Cinematic portrait",
            "Subject-led portrait with soft light",
            "portrait",
            r#"["portrait_subject","lighting_soft","camera_closeup","quality_high"]"#,
            r#"["require subject","forbid lighting=hard + mood=dreamy"]"#,
        ),
        (
            "bp-wide-scene",
            "Wide scene",
            "Establishing shot of an environment",
            "landscape",
            r#"["lighting_soft","camera_wide"]"#,
            r#"[]"#,
        ),
        (
            "bp-product",
            "Product shot",
            "Items on a styled set",
            "product",
            r#"["featured_items","scene_environment","lighting_golden","quality_high"]"#,
            r#"["require items","max_words 60"]"#,
        ),
    ];

    for (id, name, description, category, blocks, constraints) in &blueprints {
        conn.execute(
            "INSERT OR IGNORE INTO blueprints (id, name, description, category, owner_user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
            params![id, name, description, category, now],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO blueprint_versions (id, blueprint_id, version, blocks, constraints, created_at)
             VALUES (?1, ?2, 1, ?3, ?4, ?5)",
            params![format!("{id}-v1"), id, blocks, constraints, now],
        )?;
    }
    Ok(())
}

#[cfg(test)]
pub fn init_test_db() -> Result<DbPool, AppError> {
    use std::time::Duration;

    // Use a unique temp file for each test to avoid in-memory connection issues with r2d2.
    let tmp = std::env::temp_dir().join(format!("vectra_test_{}.db", uuid::Uuid::new_v4()));
    let manager = SqliteConnectionManager::file(&tmp);
    let pool = Pool::builder()
        .max_size(2)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    let conn = pool.get()?;
    migrations::run(&conn)?;
    seed_catalog(&conn)?;
    drop(conn);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent() {
        let pool = init_test_db().unwrap();
        let conn = pool.get().unwrap();
        seed_catalog(&conn).unwrap();
        migrations::run(&conn).unwrap();

        let profiles: i64 = conn
            .query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))
            .unwrap();
        assert_eq!(profiles as usize, builtin_profiles().len());

        let versions: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM blueprint_versions WHERE blueprint_id = 'bp-cinematic-portrait'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_init_db_creates_file() {
        let dir = std::env::temp_dir().join(format!("vectra_init_{}", uuid::Uuid::new_v4()));
        let pool = init_db(&dir).unwrap();
        assert!(dir.join("vectra.db").exists());
        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |r| r.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
