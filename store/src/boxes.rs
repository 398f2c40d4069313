use chrono::Utc;
use deadpool_postgres::{GenericClient, Pool};
use openclaw_common::types::BoxStatus;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Box_, box_status_from_row};

fn row_to_box(row: &tokio_postgres::Row) -> Box_ {
    Box_ {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        subscription_id: row.get("subscription_id"),
        bundle_id: row.get("bundle_id"),
        k8s_namespace: row.get("k8s_namespace"),
        telegram_user_ids: row.get("telegram_user_ids"),
        language: row.get("language"),
        model: row.get("model"),
        thinking_level: row.get("thinking_level"),
        system_prompt: row.get("system_prompt"),
        status: box_status_from_row(row.get("status")),
        health_failures: row.get("health_failures"),
        last_seen: row.get("last_seen"),
        created_at: row.get("created_at"),
        activated_at: row.get("activated_at"),
        last_updated: row.get("last_updated"),
        destroyed_at: row.get("destroyed_at"),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn create<C: GenericClient>(
    client: &C,
    customer_id: Uuid,
    subscription_id: Uuid,
    bundle_id: Option<Uuid>,
    k8s_namespace: &str,
    telegram_user_ids: &[i64],
    language: &str,
    model: &str,
    thinking_level: &str,
) -> Result<Box_> {
    let row = client
        .query_one(
            "INSERT INTO boxes
                (customer_id, subscription_id, bundle_id, k8s_namespace, telegram_user_ids,
                 language, model, thinking_level)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
            &[
                &customer_id,
                &subscription_id,
                &bundle_id,
                &k8s_namespace,
                &telegram_user_ids,
                &language,
                &model,
                &thinking_level,
            ],
        )
        .await?;
    Ok(row_to_box(&row))
}

pub async fn get(pool: &Pool, id: Uuid) -> Result<Box_> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT * FROM boxes WHERE id = $1", &[&id])
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_box(&row))
}

pub async fn list_for_customer(pool: &Pool, customer_id: Uuid) -> Result<Vec<Box_>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT * FROM boxes WHERE customer_id = $1 ORDER BY created_at",
            &[&customer_id],
        )
        .await?;
    Ok(rows.iter().map(row_to_box).collect())
}

pub async fn get_active_for_customer<C: GenericClient>(client: &C, customer_id: Uuid) -> Result<Box_> {
    let row = client
        .query_opt(
            "SELECT * FROM boxes WHERE customer_id = $1 AND status != 'destroyed'
             ORDER BY created_at DESC LIMIT 1",
            &[&customer_id],
        )
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_box(&row))
}

pub async fn set_status(pool: &Pool, id: Uuid, status: BoxStatus) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE boxes SET status = $2 WHERE id = $1",
            &[&id, &status.as_str()],
        )
        .await?;
    Ok(())
}

pub async fn mark_activated(pool: &Pool, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE boxes SET status = 'active', activated_at = $2 WHERE id = $1",
            &[&id, &Utc::now()],
        )
        .await?;
    Ok(())
}

pub async fn mark_updated(pool: &Pool, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE boxes SET last_updated = $2 WHERE id = $1",
            &[&id, &Utc::now()],
        )
        .await?;
    Ok(())
}

pub async fn mark_destroyed(pool: &Pool, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE boxes SET status = 'destroyed', destroyed_at = $2 WHERE id = $1",
            &[&id, &Utc::now()],
        )
        .await?;
    Ok(())
}

/// Applies the admissible PATCH subset (model, thinking level, system
/// prompt, permitted Telegram user ids) without touching anything else.
/// `None` leaves the existing column value alone, matching the partial
/// update semantics of `update` job payloads and `PATCH /v1/boxes/{id}`.
#[allow(clippy::too_many_arguments)]
pub async fn update_config(
    pool: &Pool,
    id: Uuid,
    model: Option<&str>,
    thinking_level: Option<&str>,
    system_prompt: Option<&str>,
    telegram_user_ids: Option<&[i64]>,
) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE boxes SET
                model = COALESCE($2, model),
                thinking_level = COALESCE($3, thinking_level),
                system_prompt = COALESCE($4, system_prompt),
                telegram_user_ids = COALESCE($5, telegram_user_ids)
             WHERE id = $1",
            &[&id, &model, &thinking_level, &system_prompt, &telegram_user_ids],
        )
        .await?;
    Ok(())
}

/// Explicitly clears `system_prompt` back to NULL — distinct from
/// `update_config`'s `COALESCE` semantics, which can only leave a column
/// alone or overwrite it with a new value, never null it out.
pub async fn clear_system_prompt(pool: &Pool, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute("UPDATE boxes SET system_prompt = NULL WHERE id = $1", &[&id])
        .await?;
    Ok(())
}

pub async fn record_health_check(pool: &Pool, id: Uuid, ready: bool, threshold: i32) -> Result<()> {
    let client = pool.get().await?;
    if ready {
        client
            .execute(
                "UPDATE boxes SET health_failures = 0,
                    status = CASE WHEN status = 'unhealthy' THEN 'active' ELSE status END
                 WHERE id = $1",
                &[&id],
            )
            .await?;
    } else {
        client
            .execute(
                "UPDATE boxes SET health_failures = health_failures + 1,
                    status = CASE WHEN health_failures + 1 >= $2 THEN 'unhealthy' ELSE status END
                 WHERE id = $1",
                &[&id, &threshold],
            )
            .await?;
    }
    Ok(())
}

pub async fn touch_last_seen(pool: &Pool, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE boxes SET last_seen = $2 WHERE id = $1",
            &[&id, &Utc::now()],
        )
        .await?;
    Ok(())
}
