//! `POST /v1/auth/session` — issues a signed opaque session token for an
//! already-resolved customer identity. This shell does not perform the
//! OAuth/social-login dance itself (spec.md §6 `[ADD]`); whatever upstream
//! identity provider authenticated the customer hands us their id.

use axum::Json;
use axum::extract::State;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use openclaw_common::rbac::SessionClaims;

use crate::dto::{AuthSessionRequest, AuthSessionResponse};
use crate::error::{Error, Result};
use crate::state::AppState;

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<AuthSessionRequest>,
) -> Result<Json<AuthSessionResponse>> {
    openclaw_store::customers::get(&state.pool, req.customer_id).await?;

    let now = Utc::now();
    let expires_at = now + Duration::seconds(state.session_ttl_seconds);
    let claims = SessionClaims {
        sub: req.customer_id,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.session_jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Other(e.into()))?;

    Ok(Json(AuthSessionResponse { token, expires_at }))
}
