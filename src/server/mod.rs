//! HTTP API over the compiler and the catalog store.

mod auth;
mod blueprints;
mod catalog;
mod loras;
mod prompts;
mod users;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::{response::IntoResponse, routing::get, Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::engine::scoring::ScoringPolicy;
use crate::engine::CatalogCache;
use crate::error::AppError;

pub use auth::{CurrentUser, USER_HEADER};
pub use prompts::GenerateRequest;

/// Shared state handed to every handler.
pub struct AppState {
    pub db: DbPool,
    pub catalog: CatalogCache,
    pub scoring: ScoringPolicy,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: DbPool, scoring: ScoringPolicy) -> SharedState {
        Arc::new(Self {
            db,
            catalog: CatalogCache::new(),
            scoring,
        })
    }
}

/// Run synchronous store work on tokio's blocking pool, keeping the caller's span.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(work))
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {e}")))?
}

pub fn router(state: SharedState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(catalog::router())
        .merge(blueprints::router())
        .merge(loras::router())
        .merge(prompts::router())
        .merge(users::router())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Any origin when no list is configured; otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(USER_HEADER),
        ]);

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "service": "vectra-prompt" }))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &AppConfig, db: DbPool) -> Result<(), AppError> {
    let addr = config.bind_addr()?;
    let state = AppState::new(db, config.scoring.clone());
    let app = router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Vectra API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Vectra API shutting down");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::{CreateUserInput, Plan, User};
    use crate::db::repos::users as user_repo;

    pub fn state() -> SharedState {
        AppState::new(init_test_db().unwrap(), ScoringPolicy::default())
    }

    pub fn user(state: &SharedState, plan: Plan) -> CurrentUser {
        let email = format!("{}@vectra.dev", uuid::Uuid::new_v4());
        let user: User = user_repo::create(&state.db, CreateUserInput { email }).unwrap();
        let user = match plan {
            Plan::Free => user,
            paid => user_repo::update_plan(&state.db, &user.id, paid).unwrap(),
        };
        CurrentUser(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocking_returns_work_result() {
        assert_eq!(blocking(|| Ok(7)).await.unwrap(), 7);
        let err = blocking::<(), _>(|| Err(AppError::Validation("bad".into()))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_router_builds_with_and_without_origins() {
        let state = test_support::state();
        let _ = router(state.clone(), &[]);
        let _ = router(state, &["http://localhost:5173".into(), "not a header\n".into()]);
    }
}
