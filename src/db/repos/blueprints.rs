use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use crate::db::models::{Blueprint, BlueprintVersion, CreateBlueprintInput, UpdateBlueprintInput};
use crate::db::repos::blocks as block_repo;
use crate::db::DbPool;
use crate::engine::constraints;
use crate::error::AppError;
use crate::validation::require_non_empty;

/// Joins each blueprint with its highest version.
const SELECT_CURRENT: &str = "SELECT b.*, v.version, v.blocks, v.constraints
     FROM blueprints b
     JOIN blueprint_versions v ON v.blueprint_id = b.id
     WHERE v.version = (SELECT MAX(version) FROM blueprint_versions WHERE blueprint_id = b.id)";

fn json_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn row_to_blueprint(row: &Row) -> rusqlite::Result<Blueprint> {
    let blocks: String = row.get("blocks")?;
    let constraints: String = row.get("constraints")?;
    Ok(Blueprint {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        category: row.get("category")?,
        owner_user_id: row.get("owner_user_id")?,
        version: row.get("version")?,
        blocks: json_list(&blocks),
        constraints: json_list(&constraints),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_version(row: &Row) -> rusqlite::Result<BlueprintVersion> {
    let blocks: String = row.get("blocks")?;
    let constraints: String = row.get("constraints")?;
    Ok(BlueprintVersion {
        id: row.get("id")?,
        blueprint_id: row.get("blueprint_id")?,
        version: row.get("version")?,
        blocks: json_list(&blocks),
        constraints: json_list(&constraints),
        created_at: row.get("created_at")?,
    })
}

// ============================================================================
// Queries
// ============================================================================

/// System (catalog) blueprints only.
pub fn get_system(pool: &DbPool) -> Result<Vec<Blueprint>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "{SELECT_CURRENT} AND b.owner_user_id IS NULL ORDER BY b.name"
    ))?;
    let rows = stmt.query_map([], row_to_blueprint)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// System blueprints plus the ones owned by `user_id`.
pub fn get_visible(pool: &DbPool, user_id: &str) -> Result<Vec<Blueprint>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "{SELECT_CURRENT} AND (b.owner_user_id IS NULL OR b.owner_user_id = ?1)
         ORDER BY b.owner_user_id IS NOT NULL, b.name"
    ))?;
    let rows = stmt.query_map(params![user_id], row_to_blueprint)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Blueprint, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        &format!("{SELECT_CURRENT} AND b.id = ?1"),
        params![id],
        row_to_blueprint,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Blueprint {id}")),
        other => AppError::Database(other),
    })
}

/// All versions, newest first.
pub fn list_versions(pool: &DbPool, id: &str) -> Result<Vec<BlueprintVersion>, AppError> {
    get_by_id(pool, id)?;
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM blueprint_versions WHERE blueprint_id = ?1 ORDER BY version DESC",
    )?;
    let rows = stmt.query_map(params![id], row_to_version)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
}

// ============================================================================
// Mutations
// ============================================================================

/// Blocks must exist in the catalog and every constraint must parse.
fn validate_content(pool: &DbPool, blocks: &[String], rules: &[String]) -> Result<(), AppError> {
    if blocks.is_empty() {
        return Err(AppError::Validation("blocks cannot be empty".into()));
    }
    let missing = block_repo::missing_keys(pool, blocks)?;
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Unknown block keys: {}",
            missing.join(", ")
        )));
    }
    constraints::validate_all(rules)
}

pub fn create(
    pool: &DbPool,
    owner_user_id: Option<&str>,
    input: CreateBlueprintInput,
) -> Result<Blueprint, AppError> {
    require_non_empty("name", &input.name)?;
    validate_content(pool, &input.blocks, &input.constraints)?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let blocks = serde_json::to_string(&input.blocks)?;
    let rules = serde_json::to_string(&input.constraints)?;

    let mut conn = pool.get()?;
    let tx = conn.transaction().map_err(AppError::Database)?;
    tx.execute(
        "INSERT INTO blueprints (id, name, description, category, owner_user_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, input.name.trim(), input.description, input.category, owner_user_id, now],
    )?;
    tx.execute(
        "INSERT INTO blueprint_versions (id, blueprint_id, version, blocks, constraints, created_at)
         VALUES (?1, ?2, 1, ?3, ?4, ?5)",
        params![uuid::Uuid::new_v4().to_string(), id, blocks, rules, now],
    )?;
    tx.commit().map_err(AppError::Database)?;

    tracing::info!(blueprint_id = %id, owner = ?owner_user_id, "Blueprint created");
    get_by_id(pool, &id)
}

/// Update metadata in place and append version `max(version) + 1` in the
/// same transaction. Every edit gets a version; blocks and constraints not
/// supplied are carried forward from the current one. Existing versions are
/// never modified.
pub fn update(pool: &DbPool, id: &str, input: UpdateBlueprintInput) -> Result<Blueprint, AppError> {
    let current = get_by_id(pool, id)?;

    if let Some(ref name) = input.name {
        require_non_empty("name", name)?;
    }
    let blocks = input.blocks.clone().unwrap_or_else(|| current.blocks.clone());
    let rules = input.constraints.clone().unwrap_or_else(|| current.constraints.clone());
    if blocks != current.blocks || rules != current.constraints {
        validate_content(pool, &blocks, &rules)?;
    }

    let now = chrono::Utc::now().to_rfc3339();
    let mut conn = pool.get()?;
    // Immediate: the MAX(version) read and the insert must not interleave with another writer
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(AppError::Database)?;

    // Build dynamic SET clause
    let name = input.name.as_deref().map(|n| n.trim().to_string());
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now.clone())];
    let mut sets: Vec<String> = vec!["updated_at = ?1".into()];

    push_field!(name, "name", sets, values);
    push_field!(input.description, "description", sets, values);
    push_field!(input.category, "category", sets, values);

    values.push(Box::new(id.to_string()));
    let sql = format!(
        "UPDATE blueprints SET {} WHERE id = ?{}",
        sets.join(", "),
        values.len()
    );

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        values.iter().map(|p| p.as_ref()).collect();
    tx.execute(&sql, params_ref.as_slice())?;

    let next: i64 = tx.query_row(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM blueprint_versions WHERE blueprint_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    tx.execute(
        "INSERT INTO blueprint_versions (id, blueprint_id, version, blocks, constraints, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            uuid::Uuid::new_v4().to_string(),
            id,
            next,
            serde_json::to_string(&blocks)?,
            serde_json::to_string(&rules)?,
            now,
        ],
    )?;
    tx.commit().map_err(AppError::Database)?;

    tracing::info!(blueprint_id = %id, version = next, "Blueprint version created");
    get_by_id(pool, id)
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM blueprints WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Owner of a blueprint, `None` for system blueprints.
pub fn owner_of(pool: &DbPool, id: &str) -> Result<Option<String>, AppError> {
    let conn = pool.get()?;
    let owner: Option<Option<String>> = conn
        .query_row(
            "SELECT owner_user_id FROM blueprints WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    owner.ok_or_else(|| AppError::NotFound(format!("Blueprint {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::CreateUserInput;
    use crate::db::repos::users as user_repo;

    fn owner(pool: &DbPool) -> String {
        user_repo::create(pool, CreateUserInput { email: "owner@vectra.dev".into() })
            .unwrap()
            .id
    }

    fn input(blocks: &[&str], rules: &[&str]) -> CreateBlueprintInput {
        CreateBlueprintInput {
            name: "Moody street".into(),
            description: None,
            category: Some("street".into()),
            blocks: blocks.iter().map(|s| s.to_string()).collect(),
            constraints: rules.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_seeded_system_blueprints() {
        let pool = init_test_db().unwrap();
        let system = get_system(&pool).unwrap();
        assert!(system.iter().all(Blueprint::is_system));
        let portrait = get_by_id(&pool, "bp-cinematic-portrait").unwrap();
        assert_eq!(portrait.version, 1);
        assert_eq!(portrait.blocks[0], "portrait_subject");
    }

    #[test]
    fn test_create_rejects_unknown_blocks_and_bad_rules() {
        let pool = init_test_db().unwrap();
        let err = create(&pool, None, input(&["lighting_soft", "ghost"], &[])).unwrap_err();
        assert!(err.to_string().contains("ghost"));

        let err = create(&pool, None, input(&["lighting_soft"], &["forbid everything"])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = create(&pool, None, input(&[], &[])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_update_creates_versions() {
        let pool = init_test_db().unwrap();
        let user = owner(&pool);
        let bp = create(&pool, Some(&user), input(&["lighting_soft"], &[])).unwrap();
        assert_eq!(bp.version, 1);
        assert_eq!(bp.owner_user_id.as_deref(), Some(user.as_str()));

        // Metadata-only edit still appends a version carrying the content forward
        let renamed = update(
            &pool,
            &bp.id,
            UpdateBlueprintInput { name: Some("Neon street".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(renamed.version, 2);
        assert_eq!(renamed.name, "Neon street");
        assert_eq!(renamed.blocks, vec!["lighting_soft"]);

        // Content edit appends version 3
        let v3 = update(
            &pool,
            &bp.id,
            UpdateBlueprintInput {
                blocks: Some(vec!["lighting_soft".into(), "camera_wide".into()]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(v3.version, 3);
        assert_eq!(v3.blocks, vec!["lighting_soft", "camera_wide"]);

        // Unchanged content is still an edit
        let v4 = update(
            &pool,
            &bp.id,
            UpdateBlueprintInput {
                blocks: Some(vec!["lighting_soft".into(), "camera_wide".into()]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(v4.version, 4);

        let versions = list_versions(&pool, &bp.id).unwrap();
        assert_eq!(versions.len(), 4);
        assert_eq!(versions[0].version, 4);
        assert_eq!(versions[3].blocks, vec!["lighting_soft"]);

        // Failed edit leaves the current version untouched
        let err = update(
            &pool,
            &bp.id,
            UpdateBlueprintInput { blocks: Some(vec!["ghost".into()]), ..Default::default() },
        );
        assert!(err.is_err());
        assert_eq!(get_by_id(&pool, &bp.id).unwrap().version, 4);
    }

    #[test]
    fn test_visibility_and_delete() {
        let pool = init_test_db().unwrap();
        let user = owner(&pool);
        let mine = create(&pool, Some(&user), input(&["camera_wide"], &["require subject"])).unwrap();

        let visible = get_visible(&pool, &user).unwrap();
        assert!(visible.iter().any(|b| b.id == mine.id));
        assert!(!get_system(&pool).unwrap().iter().any(|b| b.id == mine.id));
        assert!(!get_visible(&pool, "someone-else").unwrap().iter().any(|b| b.id == mine.id));

        assert_eq!(owner_of(&pool, &mine.id).unwrap().as_deref(), Some(user.as_str()));
        assert_eq!(owner_of(&pool, "bp-wide-scene").unwrap(), None);

        assert!(delete(&pool, &mine.id).unwrap());
        assert!(matches!(get_by_id(&pool, &mine.id), Err(AppError::NotFound(_))));
        assert!(list_versions(&pool, &mine.id).is_err());
    }
}
