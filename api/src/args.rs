use clap::Parser;
use openclaw_common::args::{InternalAuthArgs, PostgresArgs, RedisArgs};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub postgres: PostgresArgs,

    #[command(flatten)]
    pub redis: RedisArgs,

    #[command(flatten)]
    pub internal_auth: InternalAuthArgs,

    /// Base URL of the metered proxy's internal API (usage snapshot reads).
    #[arg(long, env = "PROXY_INTERNAL_URL", default_value = "http://openclaw-proxy:8080")]
    pub proxy_internal_url: String,

    /// Secret the session JWT is signed/verified with.
    #[arg(long, env = "SESSION_JWT_SECRET", required = true)]
    pub session_jwt_secret: String,

    /// Session token lifetime, in seconds.
    #[arg(long, env = "SESSION_TTL_SECONDS", default_value_t = 86_400)]
    pub session_ttl_seconds: i64,

    /// Port the external HTTP façade listens on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
}
