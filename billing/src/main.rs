use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use openclaw_common::shutdown::shutdown_signal;

mod args;
mod error;
mod handlers;
mod payloads;
mod queue;
mod server;
mod state;
mod webhook;

use args::Cli;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    openclaw_common::init();
    let cli = Cli::parse();

    openclaw_common::metrics::maybe_spawn_metrics_server();

    let pool = openclaw_common::postgres::create_pool(cli.postgres).await;
    openclaw_store::init_schema(&pool).await?;
    let redis = openclaw_common::redis::init_redis(&cli.redis).await;

    let state = AppState {
        pool,
        redis,
        webhook_secret: cli.webhook.stripe_webhook_secret,
        tolerance_seconds: cli.webhook.tolerance_seconds,
    };

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel_clone.cancel();
    });

    server::run(cancel, cli.port, state).await
}
