//! Monthly token-limit check (spec.md §4.3 step 4 / §6 `limit:<customer_id>`).
//! Cached for 60s per customer; a cache miss joins `usage_monthly` with the
//! customer's active subscription for the period covering `now()`.

use deadpool_redis::redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use openclaw_common::streams::{USAGE_LIMIT_CACHE_PREFIX, USAGE_LIMIT_CACHE_TTL_SECONDS, USAGE_WARNING_THRESHOLD};
use openclaw_store::{subscriptions, usage};

use crate::error::{Error, Result};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CachedLimit {
    pub used: i64,
    pub limit: i64,
}

impl CachedLimit {
    pub fn warning(&self) -> bool {
        self.limit > 0 && (self.used as f64 / self.limit as f64) >= USAGE_WARNING_THRESHOLD
    }

    pub fn exceeded(&self) -> bool {
        self.used >= self.limit
    }
}

fn cache_key(customer_id: Uuid) -> String {
    format!("{USAGE_LIMIT_CACHE_PREFIX}{customer_id}")
}

/// Returns the cached or freshly-queried usage snapshot for `customer_id`,
/// or `Error::NoActiveSubscription` if neither a cache entry nor an active
/// subscription/usage row exists.
pub async fn check(state: &AppState, customer_id: Uuid) -> Result<CachedLimit> {
    let key = cache_key(customer_id);
    let mut conn = state.redis.get().await.map_err(|e| Error::Other(e.into()))?;

    let cached: Option<String> = conn.get(&key).await.map_err(|e| Error::Other(e.into()))?;
    if let Some(raw) = cached {
        let parsed: CachedLimit = serde_json::from_str(&raw).map_err(|e| Error::Other(e.into()))?;
        return Ok(parsed);
    }

    let pg_client = state.pool.get().await.map_err(|e| Error::Other(e.into()))?;
    let sub = subscriptions::get_active_for_customer(&pg_client, customer_id)
        .await
        .map_err(|_| Error::NoActiveSubscription)?;
    let row = usage::get_current(&state.pool, customer_id)
        .await
        .map_err(|_| Error::NoActiveSubscription)?;

    let snapshot = CachedLimit {
        used: row.tokens_used,
        limit: sub.tokens_limit,
    };
    let serialized = serde_json::to_string(&snapshot).map_err(|e| Error::Other(e.into()))?;
    let _: () = conn
        .set_ex(&key, serialized, USAGE_LIMIT_CACHE_TTL_SECONDS)
        .await
        .map_err(|e| Error::Other(e.into()))?;
    Ok(snapshot)
}

/// In-place CAS-style bump of the cached snapshot after the usage consumer
/// flushes a batch, so the next request sees fresh consumption without
/// waiting out the 60s TTL. Preserves the existing TTL (`SET ... KEEPTTL`);
/// a cache miss here is a no-op — the next `check` call will repopulate it.
pub async fn bump_cached(state: &AppState, customer_id: Uuid, delta: i64) -> Result<()> {
    let key = cache_key(customer_id);
    let mut conn = state.redis.get().await.map_err(|e| Error::Other(e.into()))?;

    let cached: Option<String> = conn.get(&key).await.map_err(|e| Error::Other(e.into()))?;
    let Some(raw) = cached else {
        return Ok(());
    };
    let mut snapshot: CachedLimit = serde_json::from_str(&raw).map_err(|e| Error::Other(e.into()))?;
    snapshot.used += delta;
    let serialized = serde_json::to_string(&snapshot).map_err(|e| Error::Other(e.into()))?;

    let _: () = redis::cmd("SET")
        .arg(&key)
        .arg(serialized)
        .arg("KEEPTTL")
        .query_async(&mut conn)
        .await
        .map_err(|e| Error::Other(e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_fires_at_90_percent_but_not_before() {
        let below = CachedLimit { used: 899_999, limit: 1_000_000 };
        assert!(!below.warning());
        let at = CachedLimit { used: 900_000, limit: 1_000_000 };
        assert!(at.warning());
    }

    #[test]
    fn exceeded_is_used_gte_limit() {
        let exact = CachedLimit { used: 1_000_000, limit: 1_000_000 };
        assert!(exact.exceeded());
        let under = CachedLimit { used: 999_999, limit: 1_000_000 };
        assert!(!under.exceeded());
    }
}
