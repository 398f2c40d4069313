use clap::Parser;
use openclaw_common::args::{InternalAuthArgs, PostgresArgs, RedisArgs, UpstreamArgs};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub postgres: PostgresArgs,

    #[command(flatten)]
    pub redis: RedisArgs,

    #[command(flatten)]
    pub upstream: UpstreamArgs,

    #[command(flatten)]
    pub internal_auth: InternalAuthArgs,

    /// Port the proxy's HTTP surface (chat completions + internal API) listens on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
}
