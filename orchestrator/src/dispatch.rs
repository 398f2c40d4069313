//! The dispatch loop: `BLPOP` one envelope off [`openclaw_common::streams::JOB_QUEUE`],
//! take the customer's lock, run its handler, and record the outcome in
//! `operator_jobs`. At-least-once delivery — a crash between `BLPOP` and
//! `mark_complete` loses the envelope, which is why every handler is written
//! to converge idempotently on retry (see [`crate::k8s`]'s module doc).

use owo_colors::OwoColorize;
use redis::AsyncCommands;
use tokio_util::sync::CancellationToken;

use openclaw_common::lock::CustomerLock;
use openclaw_common::streams::JOB_QUEUE;
use openclaw_common::types::JobEnvelope;
use openclaw_store::operator_jobs;

use crate::handlers::{self, Ctx};

/// Blocking pop timeout, in seconds. Short enough that the loop notices
/// cancellation promptly, long enough to not busy-poll Redis.
const BLPOP_TIMEOUT_SECONDS: f64 = 1.0;

pub async fn run(ctx: Ctx, cancel: CancellationToken) {
    println!("{}", "🦀 Orchestrator dispatch loop starting".green());
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let popped: Option<(String, String)> = {
            let mut conn = match ctx.redis.get().await {
                Ok(conn) => conn,
                Err(e) => {
                    eprintln!("{} {e}", "🛑 Failed to get Redis connection:".red());
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
            };
            match conn.blpop(JOB_QUEUE, BLPOP_TIMEOUT_SECONDS).await {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("{} {e}", "🛑 BLPOP failed:".red());
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
            }
        };

        let Some((_, raw)) = popped else {
            continue;
        };

        let envelope: JobEnvelope = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(e) => {
                eprintln!("{} {e} • raw={raw}", "🛑 Dropping malformed job envelope:".red());
                continue;
            }
        };

        handle_one(&ctx, envelope).await;
    }
    println!("{}", "🛑 Orchestrator dispatch loop stopped".red());
}

async fn handle_one(ctx: &Ctx, envelope: JobEnvelope) {
    println!(
        "{} job_id={} job_type={} customer_id={}",
        "📥 Dequeued".cyan(),
        envelope.job_id,
        envelope.job_type,
        envelope.customer_id,
    );

    let lock = match CustomerLock::acquire(&ctx.redis, &envelope.customer_id.to_string()).await {
        Ok(lock) => lock,
        Err(e) => {
            eprintln!(
                "{} job_id={} customer_id={}: {e}",
                "⚠️ Dropping job, could not acquire customer lock:".yellow(),
                envelope.job_id,
                envelope.customer_id,
            );
            return;
        }
    };

    if let Err(e) = operator_jobs::mark_running(&ctx.pool, envelope.job_id).await {
        eprintln!("{} job_id={}: {e}", "🛑 Failed to mark job running:".red(), envelope.job_id);
    }

    let result = handlers::dispatch(ctx, &envelope).await;

    match &result {
        Ok(()) => {
            println!("{} job_id={}", "✅ Job complete".green(), envelope.job_id);
            if let Err(e) = operator_jobs::mark_complete(&ctx.pool, envelope.job_id).await {
                eprintln!("{} job_id={}: {e}", "🛑 Failed to mark job complete:".red(), envelope.job_id);
            }
        }
        Err(e) => {
            eprintln!("{} job_id={}: {e}", "🛑 Job failed:".red(), envelope.job_id);
            if let Err(e) = operator_jobs::mark_failed(&ctx.pool, envelope.job_id, &e.to_string()).await {
                eprintln!("{} job_id={}: {e}", "🛑 Failed to mark job failed:".red(), envelope.job_id);
            }
        }
    }

    if let Err(e) = lock.release().await {
        eprintln!(
            "{} customer_id={}: {e}",
            "⚠️ Failed to release customer lock:".yellow(),
            envelope.customer_id,
        );
    }
}
