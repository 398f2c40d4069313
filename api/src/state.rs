use std::sync::Arc;

use deadpool_postgres::Pool as PgPool;
use deadpool_redis::Pool as RedisPool;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    pub pool: PgPool,
    pub redis: RedisPool,
    pub http: reqwest::Client,
    pub proxy_internal_url: String,
    pub internal_api_key: String,
    pub session_jwt_secret: String,
    pub session_ttl_seconds: i64,
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
        proxy_internal_url: String,
        internal_api_key: String,
        session_jwt_secret: String,
        session_ttl_seconds: i64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                redis,
                http: reqwest::Client::new(),
                proxy_internal_url,
                internal_api_key,
                session_jwt_secret,
                session_ttl_seconds,
            }),
        }
    }
}
