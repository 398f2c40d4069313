//! `GET /v1/usage/{customer_id}` — proxies to the metered proxy's internal
//! usage snapshot endpoint rather than querying the store directly, so this
//! shell never needs the proxy's cache-invalidation knowledge.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::dto::UsageResponse;
use crate::error::{Error, Result};
use crate::state::AppState;

pub async fn get_usage(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<UsageResponse>> {
    let resp = state
        .http
        .get(format!("{}/internal/tokens/{customer_id}/usage", state.proxy_internal_url))
        .header("x-internal-key", &state.internal_api_key)
        .send()
        .await
        .map_err(|e| Error::UpstreamError(e.to_string()))?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::Store(openclaw_store::Error::NotFound));
    }
    if !resp.status().is_success() {
        return Err(Error::UpstreamError(format!("proxy returned {}", resp.status())));
    }

    let snapshot: UsageResponse = resp.json().await.map_err(|e| Error::UpstreamError(e.to_string()))?;
    Ok(Json(snapshot))
}
