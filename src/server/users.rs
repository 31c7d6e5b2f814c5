use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::db::models::{CreateUserInput, User};
use crate::db::repos::users as user_repo;
use crate::error::AppError;

use super::{blocking, CurrentUser, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/users", post(register))
        .route("/api/users/me", get(me))
}

#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<SharedState>,
    Json(input): Json<CreateUserInput>,
) -> Result<Json<User>, AppError> {
    let user = blocking(move || user_repo::create(&state.db, input)).await?;
    Ok(Json(user))
}

pub async fn me(user: CurrentUser) -> Json<User> {
    Json(user.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Plan;
    use crate::server::test_support;

    #[tokio::test]
    async fn test_register_defaults_to_free() {
        let state = test_support::state();
        let Json(user) = register(
            State(state.clone()),
            Json(CreateUserInput { email: "new@vectra.dev".into() }),
        )
        .await
        .unwrap();
        assert_eq!(user.plan, Plan::Free);

        let Json(me) = me(CurrentUser(user.clone())).await;
        assert_eq!(me.id, user.id);
    }

    #[tokio::test]
    async fn test_register_ignores_requested_plan() {
        let state = test_support::state();
        let input: CreateUserInput =
            serde_json::from_value(serde_json::json!({ "email": "x@y.z", "plan": "studio" })).unwrap();
        let Json(user) = register(State(state.clone()), Json(input)).await.unwrap();
        assert_eq!(user.plan, Plan::Free);

        let stored = user_repo::get_by_id(&state.db, &user.id).unwrap();
        assert_eq!(stored.plan, Plan::Free);
    }
}
