use clap::Parser;
use openclaw_common::args::{PostgresArgs, RedisArgs, WebhookArgs};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub postgres: PostgresArgs,

    #[command(flatten)]
    pub redis: RedisArgs,

    #[command(flatten)]
    pub webhook: WebhookArgs,

    /// Port the webhook HTTP server listens on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
}
