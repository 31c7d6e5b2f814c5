use std::collections::BTreeMap;

use rusqlite::{params, Row};

use crate::db::models::{CreateFilterInput, Filter, FilterEffect};
use crate::db::DbPool;
use crate::error::AppError;
use crate::validation::{require_catalog_key, require_non_empty, require_weight};

fn row_to_filter(row: &Row) -> rusqlite::Result<Filter> {
    let options: String = row.get("options")?;
    let effects: String = row.get("effects")?;
    Ok(Filter {
        key: row.get("key")?,
        name: row.get("name")?,
        options: serde_json::from_str(&options).unwrap_or_default(),
        effects: serde_json::from_str::<BTreeMap<String, FilterEffect>>(&effects)
            .unwrap_or_default(),
        is_premium: row.get::<_, i32>("is_premium")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_all(pool: &DbPool) -> Result<Vec<Filter>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT * FROM filters ORDER BY key")?;
    let rows = stmt.query_map([], row_to_filter)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_by_key(pool: &DbPool, key: &str) -> Result<Filter, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM filters WHERE key = ?1", params![key], row_to_filter)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Filter {key}")),
            other => AppError::Database(other),
        })
}

fn validate(input: &CreateFilterInput) -> Result<(), AppError> {
    require_catalog_key("key", &input.key)?;
    require_non_empty("name", &input.name)?;
    if input.options.is_empty() {
        return Err(AppError::Validation("options cannot be empty".into()));
    }
    for (value, effect) in &input.effects {
        if !input.options.contains(value) {
            return Err(AppError::Validation(format!(
                "Effect for '{value}' does not match any option"
            )));
        }
        if let Some(weight) = effect.weight {
            require_weight(&format!("effects.{value}.weight"), weight)?;
        }
    }
    Ok(())
}

pub fn create(pool: &DbPool, input: CreateFilterInput) -> Result<Filter, AppError> {
    validate(&input)?;

    let now = chrono::Utc::now().to_rfc3339();
    let options = serde_json::to_string(&input.options)?;
    let effects = serde_json::to_string(&input.effects)?;
    let conn = pool.get()?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO filters (key, name, options, effects, is_premium, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            input.key,
            input.name.trim(),
            options,
            effects,
            input.is_premium.unwrap_or(false) as i32,
            now,
        ],
    )?;
    if inserted == 0 {
        return Err(AppError::Validation(format!("Filter '{}' already exists", input.key)));
    }

    tracing::info!(key = %input.key, premium = input.is_premium.unwrap_or(false), "Filter created");
    get_by_key(pool, &input.key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    fn input(effects: &[(&str, &str, Option<f64>)]) -> CreateFilterInput {
        CreateFilterInput {
            key: "texture".into(),
            name: "Texture".into(),
            options: vec!["grainy".into(), "clean".into()],
            effects: effects
                .iter()
                .map(|(v, t, w)| (v.to_string(), FilterEffect { text: t.to_string(), weight: *w }))
                .collect(),
            is_premium: None,
        }
    }

    #[test]
    fn test_seeded_filters() {
        let pool = init_test_db().unwrap();
        let color = get_by_key(&pool, "color").unwrap();
        assert_eq!(color.effect("neon").unwrap().text, "neon accents");
        assert!(!color.is_premium);
        assert!(get_by_key(&pool, "style_pack").unwrap().is_premium);
    }

    #[test]
    fn test_create_round_trips_effects() {
        let pool = init_test_db().unwrap();
        let f = create(&pool, input(&[("grainy", "film grain", Some(1.2))])).unwrap();
        assert_eq!(f.options, vec!["grainy", "clean"]);
        assert_eq!(f.effect("grainy").unwrap().weight, Some(1.2));
        assert!(f.effect("clean").is_none());
    }

    #[test]
    fn test_effect_must_match_option() {
        let pool = init_test_db().unwrap();
        let err = create(&pool, input(&[("glossy", "gloss", None)])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = create(&pool, input(&[("grainy", "film grain", Some(4.0))])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
