use chrono::{DateTime, Utc};
use deadpool_postgres::{GenericClient, Pool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::UsageMonthly;

fn row_to_usage(row: &tokio_postgres::Row) -> UsageMonthly {
    UsageMonthly {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        period_start: row.get("period_start"),
        period_end: row.get("period_end"),
        tokens_used: row.get("tokens_used"),
        tokens_limit: row.get("tokens_limit"),
        reset_at: row.get("reset_at"),
    }
}

/// The usage row covering `now()` for a customer, if one has been created
/// yet (the billing reducer creates the first one on checkout; subsequent
/// periods are created lazily by whichever component notices a gap first).
pub async fn get_current(pool: &Pool, customer_id: Uuid) -> Result<UsageMonthly> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT * FROM usage_monthly
             WHERE customer_id = $1 AND period_start <= now() AND period_end > now()
             ORDER BY period_start DESC LIMIT 1",
            &[&customer_id],
        )
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_usage(&row))
}

/// Idempotently opens a usage period. A no-op if one already exists for
/// `(customer_id, period_start)`.
pub async fn ensure_period<C: GenericClient>(
    client: &C,
    customer_id: Uuid,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    tokens_limit: i64,
) -> Result<()> {
    client
        .execute(
            "INSERT INTO usage_monthly (customer_id, period_start, period_end, tokens_limit)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (customer_id, period_start) DO NOTHING",
            &[&customer_id, &period_start, &period_end, &tokens_limit],
        )
        .await?;
    Ok(())
}

pub async fn set_limit_for_current_period<C: GenericClient>(
    client: &C,
    customer_id: Uuid,
    tokens_limit: i64,
) -> Result<()> {
    client
        .execute(
            "UPDATE usage_monthly SET tokens_limit = $2
             WHERE customer_id = $1 AND period_start <= now() AND period_end > now()",
            &[&customer_id, &tokens_limit],
        )
        .await?;
    Ok(())
}

/// Adds `delta` tokens to whichever period currently covers `now()`.
pub async fn increment_tokens_used(pool: &Pool, customer_id: Uuid, delta: i64) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE usage_monthly SET tokens_used = tokens_used + $2
             WHERE customer_id = $1 AND period_start <= now() AND period_end > now()",
            &[&customer_id, &delta],
        )
        .await?;
    Ok(())
}

/// Records one proxied request's token accounting. `request_id` is used as
/// an idempotency key: a duplicate insert (e.g. a redelivered stream
/// message after consumer restart) is silently dropped.
#[allow(clippy::too_many_arguments)]
pub async fn insert_event(
    pool: &Pool,
    customer_id: Uuid,
    box_id: Uuid,
    model: &str,
    prompt_tokens: i32,
    completion_tokens: i32,
    request_id: Option<&str>,
) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO usage_events (customer_id, box_id, model, prompt_tokens, completion_tokens, request_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT DO NOTHING",
            &[
                &customer_id,
                &box_id,
                &model,
                &prompt_tokens,
                &completion_tokens,
                &request_id,
            ],
        )
        .await?;
    Ok(())
}
