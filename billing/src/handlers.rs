//! One reducer function per event type in spec.md §4.2's table. Each runs
//! inside the same Postgres transaction [`crate::server::process`] used to
//! claim the raw event id, so a handler failure rolls the claim back along
//! with every store mutation it made — the event is left unclaimed for the
//! provider's retry to reprocess from scratch. Business-level dedup (e.g.
//! "does this `Subscription` already exist for this external id") is
//! layered on top since the same logical change can legitimately arrive as
//! more than one event id (e.g. a resent invoice).
//!
//! Handlers never talk to Redis directly: each returns the `JobEnvelope` (if
//! any) its caller should push onto `operator:jobs` *after* the transaction
//! commits, matching spec.md §5's "updates commit before job enqueue".

use chrono::{DateTime, Duration, Utc};
use deadpool_postgres::Transaction;
use openclaw_common::types::{JobEnvelope, JobType, SubscriptionStatus, Tier};
use openclaw_store::{boxes, customers, operator_jobs, subscriptions, usage};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::payloads::{CheckoutSessionObject, InvoiceObject, SubscriptionObject};

/// Number of failed payment attempts after which a subscription is suspended
/// (spec.md §4.2's "after ≥3 attempts").
const PAYMENT_FAILURE_THRESHOLD: i64 = 3;

fn unix(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| Error::MalformedBody(format!("invalid unix timestamp {ts}")))
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|_| Error::MalformedBody(format!("invalid uuid in {field}: {value}")))
}

pub async fn checkout_session_completed(tx: &Transaction<'_>, value: serde_json::Value) -> Result<Option<JobEnvelope>> {
    let obj: CheckoutSessionObject =
        serde_json::from_value(value).map_err(|e| Error::MalformedBody(e.to_string()))?;

    if subscriptions::get_by_stripe_subscription_id(tx, &obj.subscription).await.is_ok() {
        return Ok(None); // already processed under a different event id
    }

    let customer_id = obj
        .metadata
        .openclaw_customer_id
        .as_deref()
        .ok_or_else(|| Error::MalformedBody("checkout session missing openclaw_customer_id metadata".into()))?;
    let customer_id = parse_uuid("metadata.openclaw_customer_id", customer_id)?;

    let tier = obj
        .metadata
        .tier
        .as_deref()
        .and_then(Tier::from_str_opt)
        .unwrap_or(Tier::Starter);

    customers::set_stripe_customer_id(tx, customer_id, &obj.customer).await?;

    let period_start = Utc::now();
    let period_end = period_start + Duration::days(30);
    let tokens_limit = tier.default_tokens_limit();

    let sub = subscriptions::create(
        tx,
        customer_id,
        Some(&obj.subscription),
        None,
        tier,
        tokens_limit,
        period_start,
        period_end,
    )
    .await?;

    usage::ensure_period(tx, customer_id, period_start, period_end, tokens_limit).await?;

    let telegram_user_id = obj
        .metadata
        .telegram_user_id
        .as_deref()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| Error::MalformedBody("checkout session missing telegram_user_id metadata".into()))?;
    let bot_token = obj
        .metadata
        .bot_token
        .clone()
        .ok_or_else(|| Error::MalformedBody("checkout session missing bot_token metadata".into()))?;

    let k8s_namespace = format!("customer-{customer_id}");
    let b = boxes::create(
        tx,
        customer_id,
        sub.id,
        None,
        &k8s_namespace,
        &[telegram_user_id],
        obj.metadata.language.as_deref().unwrap_or("en"),
        "kimi-coding/k2p5",
        "medium",
    )
    .await?;

    let job_id = Uuid::new_v4();
    let payload = serde_json::json!({ "bot_token": bot_token });
    operator_jobs::insert_queued(tx, job_id, customer_id, Some(b.id), JobType::Provision, &payload).await?;

    let envelope = JobEnvelope::new(JobType::Provision, customer_id).with_box(b.id).with_payload(payload);
    Ok(Some(envelope))
}

pub async fn invoice_payment_succeeded(tx: &Transaction<'_>, value: serde_json::Value) -> Result<Option<JobEnvelope>> {
    let obj: InvoiceObject = serde_json::from_value(value).map_err(|e| Error::MalformedBody(e.to_string()))?;
    if obj.billing_reason.as_deref() == Some("subscription_create") {
        return Ok(None); // already handled by checkout_session_completed
    }
    let Some(stripe_subscription_id) = &obj.subscription else {
        return Ok(None);
    };
    let sub = subscriptions::get_by_stripe_subscription_id(tx, stripe_subscription_id).await?;

    let period_start = unix(obj.period_start)?;
    let period_end = unix(obj.period_end)?;
    subscriptions::renew_period(tx, sub.id, period_start, period_end).await?;
    usage::ensure_period(tx, sub.customer_id, period_start, period_end, sub.tokens_limit).await?;

    if sub.status == SubscriptionStatus::Suspended {
        subscriptions::update_status(tx, sub.id, SubscriptionStatus::Active).await?;
        let b = boxes::get_active_for_customer(tx, sub.customer_id).await?;
        return Ok(Some(enqueue(tx, JobType::Reactivate, sub.customer_id, Some(b.id), None).await?));
    }
    Ok(None)
}

pub async fn invoice_payment_failed(tx: &Transaction<'_>, value: serde_json::Value) -> Result<Option<JobEnvelope>> {
    let obj: InvoiceObject = serde_json::from_value(value).map_err(|e| Error::MalformedBody(e.to_string()))?;
    let Some(stripe_subscription_id) = &obj.subscription else {
        return Ok(None);
    };
    if obj.attempt_count.unwrap_or(0) < PAYMENT_FAILURE_THRESHOLD {
        return Ok(None);
    }
    let sub = subscriptions::get_by_stripe_subscription_id(tx, stripe_subscription_id).await?;
    subscriptions::update_status(tx, sub.id, SubscriptionStatus::Suspended).await?;
    let b = boxes::get_active_for_customer(tx, sub.customer_id).await?;
    Ok(Some(enqueue(tx, JobType::Suspend, sub.customer_id, Some(b.id), None).await?))
}

pub async fn subscription_updated(tx: &Transaction<'_>, value: serde_json::Value) -> Result<Option<JobEnvelope>> {
    let obj: SubscriptionObject = serde_json::from_value(value).map_err(|e| Error::MalformedBody(e.to_string()))?;
    let sub = subscriptions::get_by_stripe_subscription_id(tx, &obj.id).await?;

    let period_start = unix(obj.current_period_start)?;
    let period_end = unix(obj.current_period_end)?;
    subscriptions::renew_period(tx, sub.id, period_start, period_end).await?;

    let new_tier = obj.metadata.tier.as_deref().and_then(Tier::from_str_opt);
    match new_tier {
        Some(tier) if tier != sub.tier => {
            let tokens_limit = tier.default_tokens_limit();
            subscriptions::update_tier_and_limit(tx, sub.id, tier, tokens_limit).await?;
            usage::set_limit_for_current_period(tx, sub.customer_id, tokens_limit).await?;
            let b = boxes::get_active_for_customer(tx, sub.customer_id).await?;
            let payload = serde_json::json!({ "tier": tier });
            Ok(Some(enqueue(tx, JobType::Resize, sub.customer_id, Some(b.id), Some(payload)).await?))
        }
        _ => Ok(None),
    }
}

pub async fn subscription_deleted(tx: &Transaction<'_>, value: serde_json::Value) -> Result<Option<JobEnvelope>> {
    let obj: SubscriptionObject = serde_json::from_value(value).map_err(|e| Error::MalformedBody(e.to_string()))?;
    let sub = subscriptions::get_by_stripe_subscription_id(tx, &obj.id).await?;
    subscriptions::update_status(tx, sub.id, SubscriptionStatus::Cancelled).await?;
    let b = boxes::get_active_for_customer(tx, sub.customer_id).await?;
    Ok(Some(enqueue(tx, JobType::Destroy, sub.customer_id, Some(b.id), None).await?))
}

/// Writes the audit `OperatorJob` row under `tx` and builds the matching
/// queue envelope. The caller pushes the envelope to Redis only once `tx`
/// has committed.
async fn enqueue(
    tx: &Transaction<'_>,
    job_type: JobType,
    customer_id: Uuid,
    box_id: Option<Uuid>,
    payload: Option<serde_json::Value>,
) -> Result<JobEnvelope> {
    let job_id = Uuid::new_v4();
    let stored_payload = payload.clone().unwrap_or_else(|| serde_json::json!({}));
    operator_jobs::insert_queued(tx, job_id, customer_id, box_id, job_type, &stored_payload).await?;

    let mut envelope = JobEnvelope::new(job_type, customer_id);
    if let Some(box_id) = box_id {
        envelope = envelope.with_box(box_id);
    }
    if let Some(payload) = payload {
        envelope = envelope.with_payload(payload);
    }
    Ok(envelope)
}
