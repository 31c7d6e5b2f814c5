use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::{Blueprint, BlueprintVersion, CreateBlueprintInput, UpdateBlueprintInput, User};
use crate::db::repos::blueprints as blueprint_repo;
use crate::error::AppError;

use super::{blocking, CurrentUser, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/blueprints", get(list_blueprints).post(create_blueprint))
        .route(
            "/api/blueprints/{id}",
            get(get_blueprint).put(update_blueprint).delete(delete_blueprint),
        )
        .route("/api/blueprints/{id}/versions", get(list_versions))
}

/// System blueprints are visible to everyone; user blueprints only to their
/// owner. Someone else's blueprint reads as not found.
fn ensure_visible(state: &SharedState, user: &User, id: &str) -> Result<Option<String>, AppError> {
    let owner = blueprint_repo::owner_of(&state.db, id)?;
    match owner.as_deref() {
        Some(o) if o != user.id => Err(AppError::NotFound(format!("Blueprint {id}"))),
        _ => Ok(owner),
    }
}

fn ensure_owner(state: &SharedState, user: &User, id: &str) -> Result<(), AppError> {
    match ensure_visible(state, user, id)? {
        Some(_) => Ok(()),
        None => Err(AppError::Forbidden("System blueprints are read-only".into())),
    }
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn list_blueprints(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Result<Json<Vec<Blueprint>>, AppError> {
    let list = blocking(move || blueprint_repo::get_visible(&state.db, &user.0.id)).await?;
    Ok(Json(list))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn create_blueprint(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<CreateBlueprintInput>,
) -> Result<Json<Blueprint>, AppError> {
    let created = blocking(move || blueprint_repo::create(&state.db, Some(&user.0.id), input)).await?;
    Ok(Json(created))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id, blueprint_id = %id))]
pub async fn get_blueprint(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Blueprint>, AppError> {
    let blueprint = blocking(move || {
        ensure_visible(&state, &user.0, &id)?;
        blueprint_repo::get_by_id(&state.db, &id)
    })
    .await?;
    Ok(Json(blueprint))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id, blueprint_id = %id))]
pub async fn update_blueprint(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateBlueprintInput>,
) -> Result<Json<Blueprint>, AppError> {
    let updated = blocking(move || {
        ensure_owner(&state, &user.0, &id)?;
        blueprint_repo::update(&state.db, &id, input)
    })
    .await?;
    Ok(Json(updated))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id, blueprint_id = %id))]
pub async fn delete_blueprint(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = blocking(move || {
        ensure_owner(&state, &user.0, &id)?;
        blueprint_repo::delete(&state.db, &id)
    })
    .await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id, blueprint_id = %id))]
pub async fn list_versions(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<BlueprintVersion>>, AppError> {
    let versions = blocking(move || {
        ensure_visible(&state, &user.0, &id)?;
        blueprint_repo::list_versions(&state.db, &id)
    })
    .await?;
    Ok(Json(versions))
}
