use chrono::{DateTime, Utc};
use deadpool_postgres::{GenericClient, Pool};
use openclaw_common::types::{SubscriptionStatus, Tier};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Subscription, subscription_status_from_row, tier_from_row};

fn row_to_subscription(row: &tokio_postgres::Row) -> Subscription {
    Subscription {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        stripe_price_id: row.get("stripe_price_id"),
        tier: tier_from_row(row.get("tier")),
        status: subscription_status_from_row(row.get("status")),
        tokens_limit: row.get("tokens_limit"),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn create<C: GenericClient>(
    client: &C,
    customer_id: Uuid,
    stripe_subscription_id: Option<&str>,
    stripe_price_id: Option<&str>,
    tier: Tier,
    tokens_limit: i64,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
) -> Result<Subscription> {
    let row = client
        .query_one(
            "INSERT INTO subscriptions
                (customer_id, stripe_subscription_id, stripe_price_id, tier, tokens_limit,
                 current_period_start, current_period_end)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
            &[
                &customer_id,
                &stripe_subscription_id,
                &stripe_price_id,
                &tier.as_str(),
                &tokens_limit,
                &current_period_start,
                &current_period_end,
            ],
        )
        .await?;
    Ok(row_to_subscription(&row))
}

pub async fn get(pool: &Pool, id: Uuid) -> Result<Subscription> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT * FROM subscriptions WHERE id = $1", &[&id])
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_subscription(&row))
}

pub async fn get_by_stripe_subscription_id<C: GenericClient>(
    client: &C,
    stripe_subscription_id: &str,
) -> Result<Subscription> {
    let row = client
        .query_opt(
            "SELECT * FROM subscriptions WHERE stripe_subscription_id = $1",
            &[&stripe_subscription_id],
        )
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_subscription(&row))
}

/// The subscription currently in force for a customer: active, covering
/// `now()`. Used by the proxy's monthly-limit check and the API shell.
pub async fn get_active_for_customer<C: GenericClient>(client: &C, customer_id: Uuid) -> Result<Subscription> {
    let row = client
        .query_opt(
            "SELECT * FROM subscriptions
             WHERE customer_id = $1 AND status = 'active'
               AND current_period_start <= now() AND current_period_end > now()
             ORDER BY current_period_start DESC LIMIT 1",
            &[&customer_id],
        )
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_subscription(&row))
}

pub async fn update_status<C: GenericClient>(client: &C, id: Uuid, status: SubscriptionStatus) -> Result<()> {
    client
        .execute(
            "UPDATE subscriptions SET status = $2, updated_at = now() WHERE id = $1",
            &[&id, &status.as_str()],
        )
        .await?;
    Ok(())
}

pub async fn update_tier_and_limit<C: GenericClient>(
    client: &C,
    id: Uuid,
    tier: Tier,
    tokens_limit: i64,
) -> Result<()> {
    client
        .execute(
            "UPDATE subscriptions SET tier = $2, tokens_limit = $3, updated_at = now() WHERE id = $1",
            &[&id, &tier.as_str(), &tokens_limit],
        )
        .await?;
    Ok(())
}

pub async fn renew_period<C: GenericClient>(
    client: &C,
    id: Uuid,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
) -> Result<()> {
    client
        .execute(
            "UPDATE subscriptions
             SET current_period_start = $2, current_period_end = $3, updated_at = now()
             WHERE id = $1",
            &[&id, &current_period_start, &current_period_end],
        )
        .await?;
    Ok(())
}
