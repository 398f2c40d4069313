//! Usage event stream: `push_event` is the proxy request path's fire-and-forget
//! write; [`run_consumer`] is the single background task per process that
//! drains the stream, batch-writes to Postgres, and invalidates the per-customer
//! limit cache (spec.md §4.3 step 6 and "Background usage consumer").

use deadpool_redis::redis::streams::{StreamReadOptions, StreamReadReply};
use deadpool_redis::redis::{AsyncCommands, RedisResult};
use owo_colors::OwoColorize;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use openclaw_common::streams::{USAGE_CONSUMER_GROUP, USAGE_CONSUMER_NAME, USAGE_STREAM};
use openclaw_common::types::UsageEventFields;
use openclaw_store::usage;

use crate::forward::UsageExtract;
use crate::limits;
use crate::state::AppState;

/// Pushes one usage record to `usage:events`. Best-effort: errors are
/// logged, never propagated to the caller, per spec.md §7 ("Proxy records
/// usage on a best-effort basis").
pub async fn push_event(state: &AppState, customer_id: Uuid, box_id: Option<Uuid>, usage: &UsageExtract) {
    if usage.total_tokens() <= 0 {
        return;
    }
    let fields = UsageEventFields {
        customer_id,
        box_id,
        model: usage.model.clone().unwrap_or_else(|| "unknown".to_string()),
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        request_id: usage.request_id.clone(),
    };

    let Ok(mut conn) = state.redis.get().await else {
        eprintln!("{}", "⚠️ Failed to get Redis connection to push usage event".yellow());
        return;
    };

    let items: Vec<(&str, String)> = vec![
        ("customer_id", fields.customer_id.to_string()),
        ("box_id", fields.box_id.map(|b| b.to_string()).unwrap_or_default()),
        ("model", fields.model.clone()),
        ("prompt_tokens", fields.prompt_tokens.to_string()),
        ("completion_tokens", fields.completion_tokens.to_string()),
        ("request_id", fields.request_id.clone().unwrap_or_default()),
    ];

    let result: RedisResult<String> = conn.xadd(USAGE_STREAM, "*", &items).await;
    if let Err(e) = result {
        eprintln!("{} {e}", "⚠️ Failed to push usage event:".yellow());
    }
}

struct ParsedEntry {
    id: String,
    customer_id: Uuid,
    box_id: Option<Uuid>,
    model: String,
    prompt_tokens: i32,
    completion_tokens: i32,
    request_id: Option<String>,
}

fn parse_entry(id: String, fields: HashMap<String, redis::Value>) -> Option<ParsedEntry> {
    let get = |key: &str| -> Option<String> {
        match fields.get(key)? {
            redis::Value::BulkString(b) => Some(String::from_utf8_lossy(b).to_string()),
            redis::Value::SimpleString(s) => Some(s.clone()),
            _ => None,
        }
    };
    let customer_id = Uuid::parse_str(&get("customer_id")?).ok()?;
    let box_id = get("box_id").filter(|s| !s.is_empty()).and_then(|s| Uuid::parse_str(&s).ok());
    let model = get("model").unwrap_or_else(|| "unknown".to_string());
    let prompt_tokens = get("prompt_tokens").and_then(|s| s.parse().ok()).unwrap_or(0);
    let completion_tokens = get("completion_tokens").and_then(|s| s.parse().ok()).unwrap_or(0);
    let request_id = get("request_id").filter(|s| !s.is_empty());
    Some(ParsedEntry { id, customer_id, box_id, model, prompt_tokens, completion_tokens, request_id })
}

/// Flushes a drained batch: inserts each event with a known `box_id`
/// (dedup-safe via `ON CONFLICT DO NOTHING` on `request_id`), aggregates
/// per-customer totals into one `usage_monthly` update each, then bumps the
/// in-place cache for every affected customer.
async fn flush_batch(state: &AppState, batch: Vec<ParsedEntry>) -> anyhow::Result<Vec<String>> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }

    let mut totals: HashMap<Uuid, i64> = HashMap::new();
    for entry in &batch {
        let Some(box_id) = entry.box_id else { continue };
        usage::insert_event(
            &state.pool,
            entry.customer_id,
            box_id,
            &entry.model,
            entry.prompt_tokens,
            entry.completion_tokens,
            entry.request_id.as_deref(),
        )
        .await?;
        *totals.entry(entry.customer_id).or_insert(0) += (entry.prompt_tokens + entry.completion_tokens) as i64;
    }

    for (&customer_id, &total) in &totals {
        usage::increment_tokens_used(&state.pool, customer_id, total).await?;
    }

    for (&customer_id, &total) in &totals {
        if let Err(e) = limits::bump_cached(state, customer_id, total).await {
            eprintln!("{} customer_id={customer_id}: {e}", "⚠️ Failed to bump cached usage:".yellow());
        }
    }

    println!(
        "{} count={} customers={}",
        "📊 Flushed usage batch".green(),
        batch.len(),
        totals.len(),
    );
    Ok(batch.into_iter().map(|e| e.id).collect())
}

/// The single per-process usage stream consumer. Reads via a shared
/// consumer group (`proxy-consumers`) so multiple proxy replicas split the
/// stream rather than each reprocessing every event, batches up to
/// `batch_size` entries or `flush_interval`, writes them transactionally,
/// then acks — at-least-once, idempotent on `request_id`.
pub async fn run_consumer(state: AppState, cancel: CancellationToken, batch_size: usize, flush_interval: Duration) {
    {
        let Ok(mut conn) = state.redis.get().await else {
            eprintln!("{}", "🛑 Usage consumer could not connect to Redis, exiting".red());
            return;
        };
        let _: RedisResult<()> = conn
            .xgroup_create_mkstream(USAGE_STREAM, USAGE_CONSUMER_GROUP, "0")
            .await; // ignore "already exists"
    }

    println!("{}", "📥 Usage consumer starting".green());
    let mut batch: Vec<ParsedEntry> = Vec::new();
    let mut last_flush = tokio::time::Instant::now();

    loop {
        if cancel.is_cancelled() {
            if !batch.is_empty() {
                flush_and_ack(&state, std::mem::take(&mut batch)).await;
            }
            break;
        }

        let read: Option<StreamReadReply> = {
            let Ok(mut conn) = state.redis.get().await else {
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            };
            let opts = StreamReadOptions::default()
                .group(USAGE_CONSUMER_GROUP, USAGE_CONSUMER_NAME)
                .count(batch_size)
                .block(flush_interval.as_millis() as usize);
            match conn.xread_options(&[USAGE_STREAM], &[">"], &opts).await {
                Ok(reply) => reply,
                Err(e) => {
                    eprintln!("{} {e}", "⚠️ XREADGROUP failed:".yellow());
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    None
                }
            }
        };

        if let Some(reply) = read {
            for stream_key in reply.keys {
                for id in stream_key.ids {
                    if let Some(parsed) = parse_entry(id.id.clone(), id.map) {
                        batch.push(parsed);
                    }
                }
            }
        }

        let elapsed = last_flush.elapsed();
        if !batch.is_empty() && (batch.len() >= batch_size || elapsed >= flush_interval) {
            flush_and_ack(&state, std::mem::take(&mut batch)).await;
            last_flush = tokio::time::Instant::now();
        }
    }
    println!("{}", "🛑 Usage consumer stopped".red());
}

async fn flush_and_ack(state: &AppState, batch: Vec<ParsedEntry>) {
    match flush_batch(state, batch).await {
        Ok(ids) if !ids.is_empty() => {
            if let Ok(mut conn) = state.redis.get().await {
                let _: RedisResult<i64> = conn.xack(USAGE_STREAM, USAGE_CONSUMER_GROUP, &ids).await;
            }
        }
        Ok(_) => {}
        Err(e) => eprintln!("{} {e}", "🛑 Failed to flush usage batch:".red()),
    }
}
