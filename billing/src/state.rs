use deadpool_postgres::Pool as PgPool;
use deadpool_redis::Pool as RedisPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis: RedisPool,
    pub webhook_secret: String,
    pub tolerance_seconds: i64,
}
