use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::{Block, CreateBlockInput, CreateFilterInput, Filter, Profile};
use crate::db::repos::{blocks as block_repo, filters as filter_repo, profiles as profile_repo};
use crate::error::AppError;

use super::{blocking, CurrentUser, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/profiles", get(list_profiles))
        .route("/api/blocks", get(list_blocks).post(create_block))
        .route("/api/filters", get(list_filters).post(create_filter))
}

#[tracing::instrument(skip_all)]
pub async fn list_profiles(State(state): State<SharedState>) -> Result<Json<Vec<Profile>>, AppError> {
    Ok(Json(blocking(move || profile_repo::get_all(&state.db)).await?))
}

#[tracing::instrument(skip_all)]
pub async fn list_blocks(State(state): State<SharedState>) -> Result<Json<Vec<Block>>, AppError> {
    Ok(Json(blocking(move || block_repo::get_all(&state.db)).await?))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id, key = %input.key))]
pub async fn create_block(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<CreateBlockInput>,
) -> Result<Json<Block>, AppError> {
    let db = state.db.clone();
    let block = blocking(move || block_repo::create(&db, input)).await?;
    state.catalog.invalidate();
    Ok(Json(block))
}

#[tracing::instrument(skip_all)]
pub async fn list_filters(State(state): State<SharedState>) -> Result<Json<Vec<Filter>>, AppError> {
    Ok(Json(blocking(move || filter_repo::get_all(&state.db)).await?))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id, key = %input.key))]
pub async fn create_filter(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<CreateFilterInput>,
) -> Result<Json<Filter>, AppError> {
    let db = state.db.clone();
    let filter = blocking(move || filter_repo::create(&db, input)).await?;
    state.catalog.invalidate();
    Ok(Json(filter))
}
