use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// One variant per error kind from spec.md §7; `Store`'s `NotFound` maps to
/// 404 directly since `openclaw_store::Error` doesn't distinguish "not
/// found" from other causes at the type level beyond that one variant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] openclaw_store::Error),

    #[error("missing or invalid session token")]
    AuthError,

    #[error("box is not in a state that admits this operation")]
    InvalidState,

    #[error("{0}")]
    ValidationError(String),

    #[error("upstream collaborator error: {0}")]
    UpstreamError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Store(openclaw_store::Error::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": { "message": "not found", "type": "not_found" } })),
            )
                .into_response(),
            Error::Store(openclaw_store::Error::InvalidState(msg)) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": { "message": msg, "type": "invalid_state" } })),
            )
                .into_response(),
            Error::Store(openclaw_store::Error::Conflict(msg)) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": { "message": msg, "type": "conflict" } })),
            )
                .into_response(),
            Error::Store(_) | Error::Other(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": { "message": self.to_string(), "type": "internal" } })),
            )
                .into_response(),
            Error::AuthError => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "message": self.to_string(), "type": "auth_error" } })),
            )
                .into_response(),
            Error::InvalidState => (
                StatusCode::CONFLICT,
                Json(json!({ "error": { "message": self.to_string(), "type": "invalid_state" } })),
            )
                .into_response(),
            Error::ValidationError(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": { "message": msg, "type": "validation_error" } })),
            )
                .into_response(),
            Error::UpstreamError(msg) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": { "message": msg, "type": "upstream_error" } })),
            )
                .into_response(),
        }
    }
}
