use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::db::models::{
    CreateLoraInput, CreateLoraVersionInput, LoraModel, LoraStatus, LoraVersion, User,
};
use crate::db::repos::loras as lora_repo;
use crate::error::AppError;

use super::{blocking, CurrentUser, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/loras", get(list_loras).post(create_lora))
        .route("/api/loras/{id}/versions", post(create_version))
        .route("/api/loras/{id}/versions/{version_id}", put(update_version_status))
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoraSummary {
    #[serde(flatten)]
    pub model: LoraModel,
    pub versions: Vec<LoraVersion>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLoraStatusInput {
    pub status: LoraStatus,
}

/// Another user's model reads as not found.
fn owned_model(state: &SharedState, user: &User, id: &str) -> Result<LoraModel, AppError> {
    let model = lora_repo::get_model(&state.db, id)?;
    if model.owner_user_id != user.id {
        return Err(AppError::NotFound(format!("LoRA {id}")));
    }
    Ok(model)
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn list_loras(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Result<Json<Vec<LoraSummary>>, AppError> {
    let summaries = blocking(move || {
        let models = lora_repo::get_for_user(&state.db, &user.0.id)?;
        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let versions = lora_repo::list_versions(&state.db, &model.id)?;
            out.push(LoraSummary { model, versions });
        }
        Ok(out)
    })
    .await?;
    Ok(Json(summaries))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn create_lora(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<CreateLoraInput>,
) -> Result<Json<LoraModel>, AppError> {
    let model = blocking(move || lora_repo::create_model(&state.db, &user.0.id, input)).await?;
    Ok(Json(model))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id, lora_id = %id))]
pub async fn create_version(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<CreateLoraVersionInput>,
) -> Result<Json<LoraVersion>, AppError> {
    let version = blocking(move || {
        owned_model(&state, &user.0, &id)?;
        lora_repo::create_version(&state.db, &id, input)
    })
    .await?;
    Ok(Json(version))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id, lora_id = %id, version_id = %version_id))]
pub async fn update_version_status(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path((id, version_id)): Path<(String, String)>,
    Json(input): Json<UpdateLoraStatusInput>,
) -> Result<Json<LoraVersion>, AppError> {
    let version = blocking(move || {
        owned_model(&state, &user.0, &id)?;
        let version = lora_repo::get_version(&state.db, &version_id)?;
        if version.lora_id != id {
            return Err(AppError::NotFound(format!("LoRA version {version_id}")));
        }
        lora_repo::update_version_status(&state.db, &version_id, input.status)
    })
    .await?;
    Ok(Json(version))
}
