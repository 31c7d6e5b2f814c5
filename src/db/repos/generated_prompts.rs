use rusqlite::{params, Row};

use crate::db::models::GeneratedPrompt;
use crate::db::DbPool;
use crate::engine::types::CompileOutput;
use crate::error::AppError;

fn parse_json(raw: Option<String>) -> Option<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

fn row_to_prompt(row: &Row) -> rusqlite::Result<GeneratedPrompt> {
    let warnings: String = row.get("warnings")?;
    Ok(GeneratedPrompt {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        profile_id: row.get("profile_id")?,
        blueprint_id: row.get("blueprint_id")?,
        blueprint_version: row.get("blueprint_version")?,
        compiled_prompt: row.get("compiled_prompt")?,
        seed: row.get("seed")?,
        score: row.get("score")?,
        warnings: serde_json::from_str(&warnings).unwrap_or_default(),
        metadata: parse_json(row.get("metadata")?).unwrap_or(serde_json::Value::Null),
        character_pack: parse_json(row.get("character_pack")?),
        gem_optimization: parse_json(row.get("gem_optimization")?),
        created_at: row.get("created_at")?,
    })
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<GeneratedPrompt, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM generated_prompts WHERE id = ?1",
        params![id],
        row_to_prompt,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("GeneratedPrompt {id}")),
        other => AppError::Database(other),
    })
}

/// Most recent first.
pub fn get_for_user(pool: &DbPool, user_id: &str, limit: u32) -> Result<Vec<GeneratedPrompt>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM generated_prompts WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, limit], row_to_prompt)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn create(pool: &DbPool, user_id: &str, output: &CompileOutput) -> Result<GeneratedPrompt, AppError> {
    let result = &output.result;
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let warnings = serde_json::to_string(&result.warnings)?;
    let metadata = serde_json::to_string(&result.metadata)?;
    let character_pack = output.character_pack.as_ref().map(serde_json::to_string).transpose()?;
    let gem_optimization = output.gem_optimization.as_ref().map(serde_json::to_string).transpose()?;

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO generated_prompts
         (id, user_id, profile_id, blueprint_id, blueprint_version, compiled_prompt, seed, score,
          warnings, metadata, character_pack, gem_optimization, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            id,
            user_id,
            result.metadata.profile_id,
            result.metadata.blueprint_id,
            result.metadata.blueprint_version,
            result.compiled_prompt,
            result.seed,
            result.score,
            warnings,
            metadata,
            character_pack,
            gem_optimization,
            now,
        ],
    )?;

    tracing::debug!(prompt_id = %id, user_id = %user_id, score = result.score, "Generated prompt stored");
    get_by_id(pool, &id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::CreateUserInput;
    use crate::db::repos::users as user_repo;
    use crate::engine::types::{CompileMetadata, CompileResult, GemOptimization};

    fn output(prompt: &str) -> CompileOutput {
        CompileOutput {
            result: CompileResult {
                compiled_prompt: prompt.into(),
                seed: "42".into(),
                score: 85,
                warnings: vec!["Unknown filter 'x' ignored".into()],
                metadata: CompileMetadata {
                    profile_id: "flux-dev".into(),
                    blueprint_id: "bp-wide-scene".into(),
                    blueprint_version: 1,
                    filter_count: 0,
                    block_count: 2,
                    dropped_blocks: vec![],
                    dropped_filters: vec!["x".into()],
                    constraint_violations: 0,
                    transforms: vec![],
                    truncated: false,
                    negative_prompt: None,
                    lora_applied: false,
                },
            },
            character_pack: None,
            gem_optimization: Some(GemOptimization {
                applied_gems: vec!["skin_texture".into()],
                negative_prompt: "waxy skin".into(),
                recommendations: vec![],
            }),
        }
    }

    #[test]
    fn test_store_and_list_history() {
        let pool = init_test_db().unwrap();
        let user = user_repo::create(&pool, CreateUserInput { email: "h@vectra.dev".into() })
            .unwrap();

        let stored = create(&pool, &user.id, &output("soft ambient light")).unwrap();
        assert_eq!(stored.compiled_prompt, "soft ambient light");
        assert_eq!(stored.score, 85);
        assert_eq!(stored.warnings.len(), 1);
        assert_eq!(stored.metadata["droppedFilters"][0], "x");
        assert!(stored.character_pack.is_none());
        assert_eq!(stored.gem_optimization.as_ref().unwrap()["appliedGems"][0], "skin_texture");

        create(&pool, &user.id, &output("wide angle shot")).unwrap();
        assert_eq!(get_for_user(&pool, &user.id, 10).unwrap().len(), 2);
        assert_eq!(get_for_user(&pool, &user.id, 1).unwrap().len(), 1);
        assert!(get_for_user(&pool, "other", 10).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_user_rejected_by_fk() {
        let pool = init_test_db().unwrap();
        assert!(create(&pool, "ghost", &output("x")).is_err());
    }
}
