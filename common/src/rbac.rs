use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use owo_colors::OwoColorize;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in a session token minted by the API shell after a
/// customer authenticates (e.g. via an OAuth connection broker or magic
/// link). `sub` is the customer id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

pub struct CustomerId(pub Uuid);

impl<S> FromRequestParts<S> for CustomerId
where
    S: Send + Sync,
{
    type Rejection = BadRequest;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(BadRequest)?;
        let token = header.strip_prefix("Bearer ").ok_or(BadRequest)?;
        let secret = std::env::var("SESSION_JWT_SECRET").map_err(|_| BadRequest)?;
        let claims = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            eprintln!(
                "{}",
                format!("❌ Failed to decode session token: {:?}", e).red()
            );
            BadRequest
        })?;
        Ok(CustomerId(claims.claims.sub))
    }
}

pub struct BadRequest;

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}
