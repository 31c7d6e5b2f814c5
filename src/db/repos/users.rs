use rusqlite::{params, Row};

use crate::db::models::{CreateUserInput, Plan, User};
use crate::db::DbPool;
use crate::error::AppError;
use crate::validation::require_non_empty;

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let plan: String = row.get("plan")?;
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        plan: Plan::parse(&plan).unwrap_or(Plan::Free),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<User, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], row_to_user)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("User {id}")),
            other => AppError::Database(other),
        })
}

/// New accounts always start on the free plan. Upgrades go through
/// [`update_plan`], which no public route exposes.
pub fn create(pool: &DbPool, input: CreateUserInput) -> Result<User, AppError> {
    require_non_empty("email", &input.email)?;
    let email = input.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::Validation("email must contain '@'".into()));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let plan = Plan::Free;

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO users (id, email, plan, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, email, plan.as_str(), now],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Validation(format!("User with email '{email}' already exists"))
        }
        other => AppError::Database(other),
    })?;

    tracing::info!(user_id = %id, plan = plan.as_str(), "User created");
    get_by_id(pool, &id)
}

pub fn update_plan(pool: &DbPool, id: &str, plan: Plan) -> Result<User, AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE users SET plan = ?1, updated_at = ?2 WHERE id = ?3",
        params![plan.as_str(), now, id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("User {id}")));
    }
    get_by_id(pool, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    #[test]
    fn test_user_lifecycle() {
        let pool = init_test_db().unwrap();
        let user = create(
            &pool,
            CreateUserInput { email: " Ana@Example.com ".into() },
        )
        .unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.plan, Plan::Free);

        let upgraded = update_plan(&pool, &user.id, Plan::Studio).unwrap();
        assert_eq!(upgraded.plan, Plan::Studio);
        assert!(upgraded.plan.allows_premium());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let pool = init_test_db().unwrap();
        let input = CreateUserInput { email: "a@b.co".into() };
        create(&pool, input.clone()).unwrap();
        assert!(matches!(create(&pool, input), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_unknown_user() {
        let pool = init_test_db().unwrap();
        assert!(matches!(get_by_id(&pool, "ghost"), Err(AppError::NotFound(_))));
        assert!(matches!(update_plan(&pool, "ghost", Plan::Pro), Err(AppError::NotFound(_))));
    }
}
