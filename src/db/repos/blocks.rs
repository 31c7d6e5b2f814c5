use rusqlite::{params, Row};

use crate::db::models::{Block, CreateBlockInput};
use crate::db::DbPool;
use crate::error::AppError;
use crate::validation::{require_catalog_key, require_non_empty};

fn row_to_block(row: &Row) -> rusqlite::Result<Block> {
    Ok(Block {
        key: row.get("key")?,
        name: row.get("name")?,
        template: row.get("template")?,
        category: row.get("category")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_all(pool: &DbPool) -> Result<Vec<Block>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT * FROM blocks ORDER BY category, key")?;
    let rows = stmt.query_map([], row_to_block)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_by_key(pool: &DbPool, key: &str) -> Result<Block, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM blocks WHERE key = ?1", params![key], row_to_block)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Block {key}")),
            other => AppError::Database(other),
        })
}

/// Keys from `keys` that have no block row, in input order.
pub fn missing_keys(pool: &DbPool, keys: &[String]) -> Result<Vec<String>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM blocks WHERE key = ?1")?;
    let mut missing = Vec::new();
    for key in keys {
        let count: i64 = stmt.query_row(params![key], |row| row.get(0))?;
        if count == 0 && !missing.contains(key) {
            missing.push(key.clone());
        }
    }
    Ok(missing)
}

pub fn create(pool: &DbPool, input: CreateBlockInput) -> Result<Block, AppError> {
    require_catalog_key("key", &input.key)?;
    require_non_empty("name", &input.name)?;
    require_non_empty("template", &input.template)?;

    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO blocks (key, name, template, category, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![input.key, input.name.trim(), input.template, input.category, now],
    )?;
    if inserted == 0 {
        return Err(AppError::Validation(format!("Block '{}' already exists", input.key)));
    }

    tracing::info!(key = %input.key, "Block created");
    get_by_key(pool, &input.key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    fn input(key: &str) -> CreateBlockInput {
        CreateBlockInput {
            key: key.into(),
            name: "Rain".into(),
            template: "light rain on {{environment}}".into(),
            category: Some("weather".into()),
        }
    }

    #[test]
    fn test_create_and_fetch() {
        let pool = init_test_db().unwrap();
        let block = create(&pool, input("weather_rain")).unwrap();
        assert_eq!(block.template, "light rain on {{environment}}");
        assert_eq!(get_by_key(&pool, "weather_rain").unwrap().name, "Rain");
        assert!(get_all(&pool).unwrap().iter().any(|b| b.key == "weather_rain"));
    }

    #[test]
    fn test_duplicate_and_bad_keys_rejected() {
        let pool = init_test_db().unwrap();
        create(&pool, input("weather_rain")).unwrap();
        assert!(matches!(create(&pool, input("weather_rain")), Err(AppError::Validation(_))));
        assert!(matches!(create(&pool, input("Bad Key")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_missing_keys() {
        let pool = init_test_db().unwrap();
        let keys = vec!["lighting_soft".to_string(), "ghost".to_string(), "ghost".to_string()];
        assert_eq!(missing_keys(&pool, &keys).unwrap(), vec!["ghost".to_string()]);
    }
}
