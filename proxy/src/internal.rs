//! Service-to-service API used by the orchestrator to mint/revoke proxy
//! tokens and by the billing reducer (and API shell) to read a customer's
//! current usage snapshot. Guarded by `X-Internal-Key`, never exposed past
//! the cluster's internal network.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use openclaw_common::streams::{PROXY_TOKEN_CACHE_PREFIX, PROXY_TOKEN_CACHE_TTL_SECONDS};
use openclaw_store::{proxy_tokens, subscriptions, usage};

use crate::error::{Error, Result};
use crate::state::AppState;

fn require_internal_key(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let provided = headers.get("x-internal-key").and_then(|v| v.to_str().ok());
    if state.internal_auth.verify(provided) {
        Ok(())
    } else {
        Err(Error::AuthMissing)
    }
}

#[derive(Debug, Deserialize)]
pub struct MintTokenRequest {
    pub customer_id: Uuid,
    pub box_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MintTokenResponse {
    pub token_id: Uuid,
    pub token: String,
}

/// Mints a fresh 32-hex-char bearer token, bcrypt-hashes it for storage, and
/// pre-populates the auth cache with the raw token so the very first proxied
/// request the box makes doesn't pay for a cold scan.
pub async fn mint_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<MintTokenRequest>,
) -> Result<Json<MintTokenResponse>> {
    require_internal_key(&state, &headers)?;

    let mut raw_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut raw_bytes);
    let raw_token = hex::encode(raw_bytes);

    let hash = bcrypt::hash(&raw_token, bcrypt::DEFAULT_COST).map_err(|e| Error::Other(e.into()))?;
    let token_id = Uuid::new_v4();
    proxy_tokens::insert(&state.pool, token_id, req.customer_id, req.box_id, &hash).await?;

    let cache_key = format!("{PROXY_TOKEN_CACHE_PREFIX}{raw_token}");
    let cached = crate::auth::CachedToken { customer_id: req.customer_id, token_id, box_id: req.box_id };
    let serialized = serde_json::to_string(&cached).map_err(|e| Error::Other(e.into()))?;
    if let Ok(mut conn) = state.redis.get().await {
        use deadpool_redis::redis::AsyncCommands;
        let _: std::result::Result<(), _> = conn.set_ex(&cache_key, serialized, PROXY_TOKEN_CACHE_TTL_SECONDS).await;
    }

    Ok(Json(MintTokenResponse { token_id, token: raw_token }))
}

/// Revokes a token. Absent or already-revoked is reported as `NotFound`
/// (mapped to 404 via `openclaw_store::Error`'s passthrough) rather than a
/// silent success, so the orchestrator's `destroy`/`suspend` handlers can
/// tell a genuine miss apart from a duplicate revoke attempt.
pub async fn revoke_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    require_internal_key(&state, &headers)?;
    let customer_id = proxy_tokens::revoke(&state.pool, token_id).await?;
    Ok(Json(json!({ "revoked": true, "customer_id": customer_id })))
}

#[derive(Debug, Serialize)]
pub struct UsageSnapshot {
    pub tier: String,
    pub tokens_used: i64,
    pub tokens_limit: i64,
    pub period_start: chrono::DateTime<chrono::Utc>,
    pub period_end: chrono::DateTime<chrono::Utc>,
}

/// Current-period usage snapshot for a customer, joined against their
/// active subscription for the tier label. 404s if there is no active
/// subscription or no usage period has been opened yet.
pub async fn get_usage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<UsageSnapshot>> {
    require_internal_key(&state, &headers)?;
    let client = state.pool.get().await.map_err(openclaw_store::Error::from)?;
    let sub = subscriptions::get_active_for_customer(&client, customer_id).await?;
    let row = usage::get_current(&state.pool, customer_id).await?;
    Ok(Json(UsageSnapshot {
        tier: sub.tier.as_str().to_string(),
        tokens_used: row.tokens_used,
        tokens_limit: row.tokens_limit,
        period_start: row.period_start,
        period_end: row.period_end,
    }))
}
