use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use openclaw_common::shutdown::shutdown_signal;

mod args;
mod auth;
mod error;
mod forward;
mod internal;
mod limits;
mod server;
mod state;
mod usage;

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
        cli.upstream.upstream_base_url,
        cli.upstream.upstream_api_key,
        cli.upstream.rate_limit_rps,
        cli.internal_auth,
    );

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel_clone.cancel();
    });

    let consumer_state = state.clone();
    let consumer_cancel = cancel.clone();
    let batch_size = cli.upstream.usage_flush_batch_size;
    let flush_interval = std::time::Duration::from_secs_f64(cli.upstream.usage_flush_interval_s);
    let consumer_handle = tokio::spawn(async move {
        usage::run_consumer(consumer_state, consumer_cancel, batch_size, flush_interval).await;
    });

    server::run(cancel, cli.port, state).await?;
    let _ = consumer_handle.await;
    println!("{}", "🛑 Metered proxy shut down gracefully".red());
    Ok(())
}
