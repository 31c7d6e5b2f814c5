use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::models::User;
use crate::db::repos::users as user_repo;
use crate::error::AppError;

use super::{blocking, SharedState};

/// Header carrying the caller's user id. Session handling lives in front of
/// this service; by the time a request arrives the id has been verified.
pub const USER_HEADER: &str = "x-user-id";

/// The resolved caller. Missing or unknown ids are rejected with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Auth(format!("Missing {USER_HEADER} header")))?
            .to_string();

        let db = state.db.clone();
        match blocking(move || user_repo::get_by_id(&db, &id)).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(AppError::NotFound(_)) => Err(AppError::Auth("Unknown user".into())),
            Err(e) => Err(e),
        }
    }
}
