use anyhow::{Context, Result};
use deadpool_redis::{Pool, redis::Script};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::streams::RATE_LIMIT_KEY_PREFIX;

/// Per-customer token-bucket rate limiter for the metered LLM proxy.
/// `capacity` and `refill_rate` are both set to the customer's allotted
/// requests-per-second, matching the original implementation: a customer
/// can burst up to one second's worth of requests, then is throttled to
/// a steady `rps` requests/second.
#[derive(Clone)]
pub struct TokenBucketLimiter {
    pool: Pool,
    script: Script,
}

impl TokenBucketLimiter {
    pub fn new(pool: Pool) -> Self {
        const LUA: &str = include_str!("token_bucket.lua");
        Self {
            pool,
            script: Script::new(LUA),
        }
    }

    /// Returns `Ok(true)` if the request is allowed.
    pub async fn check(&self, customer_id: &str, rps: i64) -> Result<bool> {
        let mut conn = self
            .pool
            .get()
            .await
            .context("failed to get Redis connection")?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_secs_f64();

        let key = format!("{RATE_LIMIT_KEY_PREFIX}{customer_id}");

        let result: i32 = self
            .script
            .key(key)
            .arg(rps)
            .arg(now)
            .arg(rps)
            .invoke_async(&mut conn)
            .await
            .context("failed to invoke rate limit script")?;

        Ok(result == 1)
    }
}
