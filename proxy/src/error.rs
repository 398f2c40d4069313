use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] openclaw_store::Error),

    #[error("missing or malformed Authorization header")]
    AuthMissing,

    #[error("invalid proxy token")]
    AuthInvalid,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("monthly token limit exceeded")]
    MonthlyLimitExceeded { used: i64, limit: i64 },

    #[error("no active subscription")]
    NoActiveSubscription,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::AuthMissing | Error::AuthInvalid => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "message": self.to_string(), "type": "auth_error" } })),
            )
                .into_response(),
            Error::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", "1")],
                Json(json!({ "error": { "message": "rate limit exceeded (10 req/s)", "type": "rate_limit_error" } })),
            )
                .into_response(),
            Error::MonthlyLimitExceeded { used, limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": {
                        "message": "Monthly token limit exceeded. Upgrade at app.openclaw.cloud/billing.",
                        "type": "monthly_limit_exceeded",
                        "used": used,
                        "limit": limit,
                    }
                })),
            )
                .into_response(),
            Error::NoActiveSubscription => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": { "message": "no active subscription", "type": "monthly_limit_exceeded" } })),
            )
                .into_response(),
            Error::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": { "message": msg, "type": "upstream_error" } })),
            )
                .into_response(),
            Error::Store(_) | Error::Other(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": { "message": self.to_string(), "type": "internal" } })),
            )
                .into_response(),
        }
    }
}
