//! Bearer token authentication for `/v1/chat/completions`. Verified tokens
//! are cached in Redis keyed by the raw token (spec.md §4.3 step 2 / §6
//! `proxy_token:<raw>`), so a cache hit never touches Postgres or bcrypt.

use deadpool_redis::redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use openclaw_common::streams::{PROXY_TOKEN_CACHE_PREFIX, PROXY_TOKEN_CACHE_TTL_SECONDS};
use openclaw_store::proxy_tokens;

use crate::error::{Error, Result};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub customer_id: Uuid,
    pub token_id: Uuid,
    pub box_id: Uuid,
}

/// Authenticates a raw bearer token. On a cache miss, scans every active
/// `ProxyToken` row and compares via a constant-time bcrypt verify — O(N)
/// in the number of active boxes, acceptable at the scale §9 documents.
pub async fn authenticate(state: &AppState, token: &str) -> Result<CachedToken> {
    let cache_key = format!("{PROXY_TOKEN_CACHE_PREFIX}{token}");

    let mut conn = state.redis.get().await.map_err(|e| Error::Other(e.into()))?;
    let cached: Option<String> = conn.get(&cache_key).await.map_err(|e| Error::Other(e.into()))?;
    if let Some(raw) = cached {
        let parsed: CachedToken = serde_json::from_str(&raw).map_err(|e| Error::Other(e.into()))?;
        return Ok(parsed);
    }

    let active = proxy_tokens::list_active(&state.pool).await?;
    for candidate in active {
        if bcrypt::verify(token, &candidate.token_hash).unwrap_or(false) {
            let entry = CachedToken {
                customer_id: candidate.customer_id,
                token_id: candidate.id,
                box_id: candidate.box_id,
            };
            let serialized = serde_json::to_string(&entry).map_err(|e| Error::Other(e.into()))?;
            let _: () = conn
                .set_ex(&cache_key, serialized, PROXY_TOKEN_CACHE_TTL_SECONDS)
                .await
                .map_err(|e| Error::Other(e.into()))?;
            return Ok(entry);
        }
    }

    Err(Error::AuthInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_token_round_trips_through_json() {
        let entry = CachedToken {
            customer_id: Uuid::new_v4(),
            token_id: Uuid::new_v4(),
            box_id: Uuid::new_v4(),
        };
        let raw = serde_json::to_string(&entry).unwrap();
        let back: CachedToken = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.customer_id, entry.customer_id);
        assert_eq!(back.token_id, entry.token_id);
    }
}
