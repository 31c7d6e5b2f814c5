use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::db::models::{GeneratedPrompt, LoraStatus, User};
use crate::db::repos::{
    blueprints as blueprint_repo, generated_prompts as prompt_repo, loras as lora_repo,
};
use crate::engine::catalog::CatalogSnapshot;
use crate::engine::types::{CinematicSettings, CompileInput, CompileOutput, LoraActivation};
use crate::engine::{compile, CompileContext, UserBlueprintRegistration};
use crate::error::AppError;

use super::{blocking, CurrentUser, SharedState};

const DEFAULT_HISTORY_LIMIT: u32 = 50;
const MAX_HISTORY_LIMIT: u32 = 200;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/prompts/compile", post(generate))
        .route("/api/prompts", get(history))
}

/// Body of `POST /api/prompts/compile`: the compile input plus the
/// request-scoped augmentation options.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub input: CompileInput,
    #[serde(default)]
    pub lora_version_id: Option<String>,
    /// Overrides the version's default weight.
    #[serde(default)]
    pub lora_weight: Option<f64>,
    #[serde(default)]
    pub cinematic_settings: Option<CinematicSettings>,
    #[serde(default)]
    pub gemini_gems: Vec<String>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub id: String,
    #[serde(flatten)]
    pub output: CompileOutput,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

// ============================================================================
// Request resolution
// ============================================================================

/// Free plans cannot select premium filters. Checked before anything is
/// compiled.
fn check_premium(user: &User, snapshot: &CatalogSnapshot, input: &CompileInput) -> Result<(), AppError> {
    if user.plan.allows_premium() {
        return Ok(());
    }
    let premium = snapshot.premium_filters(input.filters.keys());
    if premium.is_empty() {
        return Ok(());
    }
    tracing::info!(user_id = %user.id, filters = ?premium, "Premium filters rejected for free plan");
    Err(AppError::PremiumRequired(premium))
}

/// A user blueprint is registered only when the id is not a catalog
/// blueprint and the caller owns it. Anything else is left for the compiler
/// to report as unknown.
fn resolve_user_blueprint(
    state: &SharedState,
    user: &User,
    snapshot: &CatalogSnapshot,
    blueprint_id: &str,
) -> Result<Option<UserBlueprintRegistration>, AppError> {
    if snapshot.blueprint(blueprint_id).is_some() {
        return Ok(None);
    }
    match blueprint_repo::get_by_id(&state.db, blueprint_id) {
        Ok(bp) if bp.owner_user_id.as_deref() == Some(user.id.as_str()) => {
            Ok(Some(UserBlueprintRegistration::from(&bp)))
        }
        Ok(_) | Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn resolve_lora(
    state: &SharedState,
    user: &User,
    request: &GenerateRequest,
) -> Result<Option<LoraActivation>, AppError> {
    let Some(version_id) = request.lora_version_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    else {
        return Ok(None);
    };

    let unknown = || AppError::Validation(format!("Unknown LoRA version '{version_id}'"));
    let (version, model) = match lora_repo::get_version_with_model(&state.db, version_id) {
        Ok(found) => found,
        Err(AppError::NotFound(_)) => return Err(unknown()),
        Err(e) => return Err(e),
    };
    if model.owner_user_id != user.id {
        return Err(unknown());
    }
    if version.status != LoraStatus::Ready {
        return Err(AppError::Validation(format!(
            "LoRA version '{version_id}' is not ready (status: {})",
            version.status.as_str()
        )));
    }

    Ok(Some(LoraActivation {
        version: version.version,
        weight: request.lora_weight.unwrap_or(version.default_weight),
        trigger_word: model.trigger_word,
        model_name: model.model_name,
    }))
}

// ============================================================================
// Handlers
// ============================================================================

#[tracing::instrument(
    skip_all,
    fields(user_id = %user.0.id, profile = %request.input.profile_id, blueprint = %request.input.blueprint_id)
)]
pub async fn generate(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let response = blocking(move || {
        let user = user.0;
        let snapshot = state.catalog.snapshot(&state.db)?;

        check_premium(&user, &snapshot, &request.input)?;

        let mut ctx = CompileContext::new(request.input.clone())
            .set_active_lora(resolve_lora(&state, &user, &request)?)
            .with_cinematic(request.cinematic_settings.clone())
            .with_gems(request.gemini_gems.clone());
        if let Some(reg) = resolve_user_blueprint(&state, &user, &snapshot, &request.input.blueprint_id)? {
            ctx = ctx.register_user_blueprint(reg);
        }

        let output = compile(&ctx, &snapshot, &state.scoring)?;
        let stored = prompt_repo::create(&state.db, &user.id, &output)?;

        tracing::info!(prompt_id = %stored.id, score = output.result.score, "Prompt generated");
        Ok(GenerateResponse { id: stored.id, output })
    })
    .await?;
    Ok(Json(response))
}

#[tracing::instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn history(
    State(state): State<SharedState>,
    user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<GeneratedPrompt>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
    let prompts = blocking(move || prompt_repo::get_for_user(&state.db, &user.0.id, limit)).await?;
    Ok(Json(prompts))
}
