use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use redis::AsyncCommands;
use tokio_util::sync::CancellationToken;

use openclaw_common::shutdown::shutdown_signal;
use openclaw_common::streams::JOB_QUEUE;
use openclaw_common::types::{JobEnvelope, JobType};

mod args;
mod dispatch;
mod error;
mod handlers;
mod k8s;
mod payloads;
mod proxy_client;

use args::{Cli, Commands, EnqueueArgs, ServerArgs};
use handlers::Ctx;
use proxy_client::ProxyClient;

#[tokio::main]
async fn main() -> Result<()> {
    openclaw_common::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Server(args) => run_server(args).await,
        Commands::Enqueue(args) => run_enqueue(args).await,
    }
}

async fn run_server(args: ServerArgs) -> Result<()> {
    openclaw_common::metrics::maybe_spawn_metrics_server();

    let pool = openclaw_common::postgres::create_pool(args.postgres).await;
    openclaw_store::init_schema(&pool).await?;
    let redis = openclaw_common::redis::init_redis(&args.redis).await;

    println!("{}", "☸️ Connecting to Kubernetes".green());
    let k8s_client = kube::Client::try_default()
        .await
        .context("failed to build Kubernetes client")?;

    let proxy = ProxyClient::new(args.proxy_internal_url, args.internal_auth.internal_api_key);

    let ctx = Ctx::new(
        pool,
        redis,
        k8s_client,
        proxy,
        args.k8s.box_image,
        std::time::Duration::from_secs(args.k8s.pod_ready_timeout),
        std::time::Duration::from_secs(args.k8s.rollout_timeout),
        args.health_failure_threshold,
        args.proxy_base_url,
        platform_egress_cidrs(),
        args.connections_document,
    );

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel_clone.cancel();
    });

    openclaw_common::signal_ready();
    dispatch::run(ctx, cancel).await;
    println!("{}", "🛑 Orchestrator shut down gracefully".red());
    Ok(())
}

async fn run_enqueue(args: EnqueueArgs) -> Result<()> {
    let redis = openclaw_common::redis::init_redis(&args.redis).await;

    let job_type: JobType = serde_json::from_value(serde_json::Value::String(args.job_type.clone()))
        .map_err(|_| anyhow::anyhow!("unknown job type: {}", args.job_type))?;

    let mut envelope = JobEnvelope::new(job_type, args.customer_id);
    if let Some(box_id) = args.box_id {
        envelope = envelope.with_box(box_id);
    }
    if let Some(payload) = args.payload {
        let value: serde_json::Value =
            serde_json::from_str(&payload).context("payload is not valid JSON")?;
        envelope = envelope.with_payload(value);
    }

    let raw = serde_json::to_string(&envelope)?;
    let mut conn = redis.get().await.context("failed to get Redis connection")?;
    let _: () = conn
        .rpush(JOB_QUEUE, raw)
        .await
        .context("failed to push job envelope")?;

    println!(
        "{} job_id={} job_type={}",
        "📤 Enqueued".green(),
        envelope.job_id,
        envelope.job_type,
    );
    Ok(())
}

/// CIDRs the per-box `NetworkPolicy` allows egress to beyond the public
/// internet on 443 — the platform's own Postgres/Redis/proxy subnets.
/// Read from `PLATFORM_EGRESS_CIDRS` as a comma-separated list; empty if
/// unset, which restricts boxes to public HTTPS + DNS only.
fn platform_egress_cidrs() -> Vec<String> {
    std::env::var("PLATFORM_EGRESS_CIDRS")
        .ok()
        .map(|raw| raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}
