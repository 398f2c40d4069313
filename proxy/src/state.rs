use std::sync::Arc;

use deadpool_postgres::Pool as PgPool;
use deadpool_redis::Pool as RedisPool;
use openclaw_common::args::InternalAuthArgs;
use openclaw_common::rate_limit::TokenBucketLimiter;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    pub pool: PgPool,
    pub redis: RedisPool,
    pub http: reqwest::Client,
    pub upstream_base_url: String,
    pub upstream_api_key: String,
    pub rate_limiter: TokenBucketLimiter,
    pub rate_limit_rps: i64,
    pub internal_auth: InternalAuthArgs,
}

impl std::ops::Deref for AppState {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AppState {
    pub fn new(
        pool: PgPool,
        redis: RedisPool,
        upstream_base_url: String,
        upstream_api_key: String,
        rate_limit_rps: i64,
        internal_auth: InternalAuthArgs,
    ) -> Self {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build upstream HTTP client");

        Self {
            inner: Arc::new(Inner {
                rate_limiter: TokenBucketLimiter::new(redis.clone()),
                pool,
                redis,
                http,
                upstream_base_url,
                upstream_api_key,
                rate_limit_rps,
                internal_auth,
            }),
        }
    }
}
