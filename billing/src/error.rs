use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] openclaw_store::Error),

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed webhook body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            Error::InvalidSignature => (StatusCode::UNAUTHORIZED, "auth_error"),
            Error::MalformedBody(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Error::Store(_) | Error::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let body = json!({ "type": kind, "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}
