use rusqlite::{params, Row};

use crate::db::models::{NegativeSyntax, Profile, WeightSyntax};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
    let weight: String = row.get("weight_syntax")?;
    let negative: String = row.get("negative_syntax")?;
    Ok(Profile {
        id: row.get("id")?,
        name: row.get("name")?,
        platform: row.get("platform")?,
        max_length: row.get("max_length")?,
        weight_syntax: WeightSyntax::parse(&weight).unwrap_or(WeightSyntax::None),
        negative_syntax: NegativeSyntax::parse(&negative).unwrap_or(NegativeSyntax::None),
        separator: row.get("separator")?,
        is_builtin: row.get::<_, i32>("is_builtin")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_all(pool: &DbPool) -> Result<Vec<Profile>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT * FROM profiles ORDER BY name")?;
    let rows = stmt.query_map([], row_to_profile)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Profile, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM profiles WHERE id = ?1",
        params![id],
        row_to_profile,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Profile {id}")),
        other => AppError::Database(other),
    })
}
