use rusqlite::{params, Row, TransactionBehavior};

use crate::db::models::{
    CreateLoraInput, CreateLoraVersionInput, LoraModel, LoraStatus, LoraVersion,
};
use crate::db::DbPool;
use crate::error::AppError;
use crate::validation::{require_non_empty, require_weight};

fn row_to_model(row: &Row) -> rusqlite::Result<LoraModel> {
    Ok(LoraModel {
        id: row.get("id")?,
        owner_user_id: row.get("owner_user_id")?,
        name: row.get("name")?,
        model_name: row.get("model_name")?,
        trigger_word: row.get("trigger_word")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_version(row: &Row) -> rusqlite::Result<LoraVersion> {
    let status: String = row.get("status")?;
    Ok(LoraVersion {
        id: row.get("id")?,
        lora_id: row.get("lora_id")?,
        version: row.get("version")?,
        status: LoraStatus::parse(&status).unwrap_or(LoraStatus::Failed),
        default_weight: row.get("default_weight")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

// ============================================================================
// Models
// ============================================================================

pub fn get_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<LoraModel>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM lora_models WHERE owner_user_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![user_id], row_to_model)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_model(pool: &DbPool, id: &str) -> Result<LoraModel, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM lora_models WHERE id = ?1", params![id], row_to_model)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("LoRA {id}")),
            other => AppError::Database(other),
        })
}

pub fn create_model(
    pool: &DbPool,
    owner_user_id: &str,
    input: CreateLoraInput,
) -> Result<LoraModel, AppError> {
    require_non_empty("name", &input.name)?;
    require_non_empty("modelName", &input.model_name)?;
    require_non_empty("triggerWord", &input.trigger_word)?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO lora_models (id, owner_user_id, name, model_name, trigger_word, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            id,
            owner_user_id,
            input.name.trim(),
            input.model_name.trim(),
            input.trigger_word.trim(),
            now,
        ],
    )?;

    tracing::info!(lora_id = %id, owner = %owner_user_id, "LoRA model created");
    get_model(pool, &id)
}

// ============================================================================
// Versions
// ============================================================================

pub fn get_version(pool: &DbPool, id: &str) -> Result<LoraVersion, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM lora_versions WHERE id = ?1", params![id], row_to_version)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("LoRA version {id}")),
            other => AppError::Database(other),
        })
}

pub fn list_versions(pool: &DbPool, lora_id: &str) -> Result<Vec<LoraVersion>, AppError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT * FROM lora_versions WHERE lora_id = ?1 ORDER BY version DESC")?;
    let rows = stmt.query_map(params![lora_id], row_to_version)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
}

/// Append a version numbered `max(version) + 1` for the model.
pub fn create_version(
    pool: &DbPool,
    lora_id: &str,
    input: CreateLoraVersionInput,
) -> Result<LoraVersion, AppError> {
    get_model(pool, lora_id)?;
    let weight = input.default_weight.unwrap_or(1.0);
    require_weight("defaultWeight", weight)?;
    let status = input.status.unwrap_or(LoraStatus::Training);

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let mut conn = pool.get()?;
    // Immediate takes the write lock up front so concurrent numbering waits on busy_timeout
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(AppError::Database)?;
    let next: i64 = tx.query_row(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM lora_versions WHERE lora_id = ?1",
        params![lora_id],
        |row| row.get(0),
    )?;
    tx.execute(
        "INSERT INTO lora_versions (id, lora_id, version, status, default_weight, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, lora_id, next, status.as_str(), weight, now],
    )?;
    tx.commit().map_err(AppError::Database)?;

    tracing::info!(lora_id = %lora_id, version = next, status = status.as_str(), "LoRA version created");
    get_version(pool, &id)
}

pub fn update_version_status(
    pool: &DbPool,
    id: &str,
    status: LoraStatus,
) -> Result<LoraVersion, AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE lora_versions SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("LoRA version {id}")));
    }
    get_version(pool, id)
}

/// A version together with the model it belongs to.
pub fn get_version_with_model(
    pool: &DbPool,
    version_id: &str,
) -> Result<(LoraVersion, LoraModel), AppError> {
    let version = get_version(pool, version_id)?;
    let model = get_model(pool, &version.lora_id)?;
    Ok((version, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::CreateUserInput;
    use crate::db::repos::users as user_repo;

    fn setup() -> (DbPool, String, LoraModel) {
        let pool = init_test_db().unwrap();
        let user = user_repo::create(&pool, CreateUserInput { email: "l@vectra.dev".into() })
            .unwrap();
        let model = create_model(
            &pool,
            &user.id,
            CreateLoraInput {
                name: "Mara".into(),
                model_name: "mara-v1".into(),
                trigger_word: "mxra woman".into(),
            },
        )
        .unwrap();
        (pool, user.id, model)
    }

    #[test]
    fn test_versions_are_numbered_per_model() {
        let (pool, user_id, model) = setup();
        let v1 = create_version(&pool, &model.id, CreateLoraVersionInput::default()).unwrap();
        let v2 = create_version(
            &pool,
            &model.id,
            CreateLoraVersionInput { status: Some(LoraStatus::Ready), default_weight: Some(0.7) },
        )
        .unwrap();
        assert_eq!((v1.version, v1.status), (1, LoraStatus::Training));
        assert_eq!((v2.version, v2.status), (2, LoraStatus::Ready));
        assert_eq!(v2.default_weight, 0.7);

        assert_eq!(list_versions(&pool, &model.id).unwrap()[0].version, 2);
        assert_eq!(get_for_user(&pool, &user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_versions_get_distinct_numbers() {
        let (pool, _, model) = setup();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                let lora_id = model.id.clone();
                std::thread::spawn(move || {
                    (0..3)
                        .map(|_| create_version(&pool, &lora_id, CreateLoraVersionInput::default()).unwrap().version)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut numbers: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        numbers.sort();
        assert_eq!(numbers, (1..=12).collect::<Vec<i64>>());
    }

    #[test]
    fn test_status_update_and_join() {
        let (pool, _, model) = setup();
        let v1 = create_version(&pool, &model.id, CreateLoraVersionInput::default()).unwrap();
        let ready = update_version_status(&pool, &v1.id, LoraStatus::Ready).unwrap();
        assert_eq!(ready.status, LoraStatus::Ready);

        let (version, joined) = get_version_with_model(&pool, &v1.id).unwrap();
        assert_eq!(version.id, v1.id);
        assert_eq!(joined.trigger_word, "mxra woman");
    }

    #[test]
    fn test_invalid_inputs() {
        let (pool, _, model) = setup();
        let err = create_version(
            &pool,
            &model.id,
            CreateLoraVersionInput { status: None, default_weight: Some(5.0) },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(matches!(
            create_version(&pool, "ghost", CreateLoraVersionInput::default()),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(get_version_with_model(&pool, "ghost"), Err(AppError::NotFound(_))));
    }
}
