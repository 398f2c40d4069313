//! Per-customer distributed lock over Redis. The orchestrator's dispatch
//! loop takes one of these before acting on any job for a given customer, so
//! that two replicas never provision/resize/destroy the same customer's
//! resources concurrently.

use anyhow::{Context, Result, bail};
use deadpool_redis::{Pool, redis::Script};
use rand::Rng;
use tokio::time::{Duration, Instant, sleep};

use crate::streams::{LOCK_ACQUIRE_TIMEOUT_SECONDS, LOCK_KEY_PREFIX, LOCK_LEASE_SECONDS};

const UNLOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Held while the lock's key is present under our token. Dropping this
/// without calling `release` leaves the lock to expire on its own after
/// `LOCK_LEASE_SECONDS` — the lease is the backstop against a crashed
/// holder, not something callers should rely on for timely release.
pub struct CustomerLock {
    pool: Pool,
    key: String,
    token: String,
}

impl CustomerLock {
    /// Blocks (polling with jitter) until the lock for `customer_id` is
    /// acquired or `LOCK_ACQUIRE_TIMEOUT_SECONDS` elapses.
    pub async fn acquire(pool: &Pool, customer_id: &str) -> Result<Self> {
        let key = format!("{LOCK_KEY_PREFIX}{customer_id}");
        let token = uuid::Uuid::new_v4().to_string();
        let deadline = Instant::now() + Duration::from_secs(LOCK_ACQUIRE_TIMEOUT_SECONDS);

        loop {
            let mut conn = pool.get().await.context("failed to get Redis connection")?;
            let acquired: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(LOCK_LEASE_SECONDS * 1000)
                .query_async(&mut conn)
                .await
                .context("failed to attempt lock acquisition")?;
            if acquired.is_some() {
                return Ok(Self { pool: pool.clone(), key, token });
            }
            if Instant::now() >= deadline {
                bail!("timed out waiting for lock on customer {customer_id}");
            }
            let jitter_ms = rand::rng().random_range(50..250);
            sleep(Duration::from_millis(jitter_ms)).await;
        }
    }

    /// Releases the lock, but only if we still hold it (compare-and-delete
    /// via the Lua script above, guarding against releasing a lock some
    /// other holder has since acquired after our lease expired).
    pub async fn release(self) -> Result<()> {
        let mut conn = self.pool.get().await.context("failed to get Redis connection")?;
        let script = Script::new(UNLOCK_SCRIPT);
        let _: i32 = script
            .key(&self.key)
            .arg(&self.token)
            .invoke_async(&mut conn)
            .await
            .context("failed to invoke unlock script")?;
        Ok(())
    }
}
