use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use openclaw_common::shutdown::shutdown_signal;

mod args;
mod dto;
mod error;
mod handlers;
mod queue;
mod server;
mod state;

use args::Cli;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    openclaw_common::init();
    openclaw_common::metrics::maybe_spawn_metrics_server();
    let cli = Cli::parse();

    let pool = openclaw_common::postgres::create_pool(cli.postgres).await;
    openclaw_store::init_schema(&pool).await?;
    let redis = openclaw_common::redis::init_redis(&cli.redis).await;

    let state = AppState::new(
        pool,
        redis,
        cli.proxy_internal_url,
        cli.internal_auth.internal_api_key,
        cli.session_jwt_secret,
        cli.session_ttl_seconds,
    );

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel_clone.cancel();
    });

    server::run(cancel, cli.port, state).await?;
    println!("{}", "🛑 API shell shut down gracefully".red());
    Ok(())
}
