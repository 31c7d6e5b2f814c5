use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// App-wide error type. Every fallible function returns `Result<T, AppError>`.
/// Serializes as `{ error, kind }` so the frontend gets structured error messages.
///
/// Data-quality problems inside a compile (unknown block or filter keys,
/// violated constraints) are never errors; they end up in the result's
/// `warnings`. Only references the compiler cannot resolve at all surface here.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A free-plan user selected one or more premium filters.
    #[error("Premium plan required for filters: {}", .0.join(", "))]
    PremiumRequired(Vec<String>),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::Pool(_) => "pool",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Forbidden(_) => "forbidden",
            AppError::PremiumRequired(_) => "premium_required",
            AppError::Auth(_) => "auth",
            AppError::Io(_) => "io",
            AppError::Serde(_) => "serde",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) | AppError::PremiumRequired(_) => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Io(_)
            | AppError::Serde(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// We serialize as `{ error: "...", kind: "..." }` for frontend consumption.
/// Premium gating failures additionally carry `isPremiumRequired` and the
/// offending filter keys so the UI can show the upgrade prompt.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        match self {
            AppError::PremiumRequired(keys) => {
                let mut s = serializer.serialize_struct("AppError", 4)?;
                s.serialize_field("error", &self.to_string())?;
                s.serialize_field("kind", self.kind())?;
                s.serialize_field("isPremiumRequired", &true)?;
                s.serialize_field("premiumFilters", keys)?;
                s.end()
            }
            _ => {
                let mut s = serializer.serialize_struct("AppError", 2)?;
                s.serialize_field("error", &self.to_string())?;
                s.serialize_field("kind", self.kind())?;
                s.end()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        } else {
            tracing::debug!(kind = self.kind(), status = %status, "{}", self);
        }
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premium_required_serializes_flag() {
        let err = AppError::PremiumRequired(vec!["style_pack".into()]);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "premium_required");
        assert_eq!(json["isPremiumRequired"], true);
        assert_eq!(json["premiumFilters"][0], "style_pack");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = AppError::Validation("Unknown blueprint bp-x".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "validation");
        assert!(json.get("isPremiumRequired").is_none());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
