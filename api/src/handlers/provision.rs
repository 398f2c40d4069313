//! `POST /internal/provision` — the literal shape exercised by Concrete
//! Scenario S1: creates a `Customer` (if new), a `Subscription`, a `Box` in
//! `pending` status, the audit `OperatorJob` row, and enqueues the matching
//! `provision` job. Everything downstream happens in the orchestrator.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use openclaw_common::types::{JobEnvelope, JobType};
use openclaw_store::{boxes, customers, operator_jobs, subscriptions};
use uuid::Uuid;

use crate::dto::{ProvisionRequest, ProvisionResponse};
use crate::error::{Error, Result};
use crate::queue::push_job;
use crate::state::AppState;

/// Internal endpoints are cluster-only, never fronted by the customer-facing
/// ingress; the orchestrator's billing webhook and this shell's own
/// provisioning flow both present the same shared secret on this header.
fn require_internal_key(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let provided = headers.get("x-internal-key").and_then(|v| v.to_str().ok());
    if key_matches(&state.internal_api_key, provided) {
        Ok(())
    } else {
        Err(Error::AuthError)
    }
}

fn key_matches(configured: &str, provided: Option<&str>) -> bool {
    !configured.is_empty() && provided == Some(configured)
}

/// Default box settings for a freshly-provisioned box: no bundle override
/// picks the platform default model/prompt, matching the teacher's own
/// "defaults unless a bundle says otherwise" convention.
const DEFAULT_MODEL: &str = "kimi-coding/k2p5";
const DEFAULT_THINKING_LEVEL: &str = "medium";
const DEFAULT_LANGUAGE: &str = "en";

pub async fn provision(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProvisionRequest>,
) -> Result<Json<ProvisionResponse>> {
    require_internal_key(&state, &headers)?;

    let customer = match customers::get_by_email(&state.pool, &req.customer_email).await {
        Ok(c) => c,
        Err(openclaw_store::Error::NotFound) => customers::create(&state.pool, &req.customer_email).await?,
        Err(e) => return Err(e.into()),
    };

    let (model, thinking_level, language) = match req.bundle_id {
        Some(bundle_id) => {
            let bundle = openclaw_store::bundles::get(&state.pool, bundle_id).await?;
            (bundle.default_model, DEFAULT_THINKING_LEVEL.to_string(), DEFAULT_LANGUAGE.to_string())
        }
        None => (DEFAULT_MODEL.to_string(), DEFAULT_THINKING_LEVEL.to_string(), DEFAULT_LANGUAGE.to_string()),
    };

    let period_start = Utc::now();
    let period_end = period_start + Duration::days(30);
    let tokens_limit = req.tier.default_tokens_limit();

    let client = state.pool.get().await.map_err(openclaw_store::Error::from)?;

    let sub = subscriptions::create(
        &client,
        customer.id,
        None,
        None,
        req.tier,
        tokens_limit,
        period_start,
        period_end,
    )
    .await?;
    openclaw_store::usage::ensure_period(&client, customer.id, period_start, period_end, tokens_limit).await?;

    let k8s_namespace = format!("customer-{}", customer.id);
    let b = boxes::create(
        &client,
        customer.id,
        sub.id,
        req.bundle_id,
        &k8s_namespace,
        &[req.telegram_user_id],
        &language,
        &model,
        &thinking_level,
    )
    .await?;

    let job_id = Uuid::new_v4();
    // The orchestrator's `provision` handler requires a bot token to seed the
    // box's Telegram credentials; this endpoint's documented request body
    // does not carry one (unlike the billing-driven provision path, whose
    // Stripe checkout metadata does). Left empty here; a subsequent `update`
    // job supplies the real token once the customer connects their bot.
    let payload = serde_json::json!({ "bot_token": "" });
    operator_jobs::insert_queued(&client, job_id, customer.id, Some(b.id), JobType::Provision, &payload).await?;

    let envelope = JobEnvelope::new(JobType::Provision, customer.id).with_box(b.id).with_payload(payload);
    push_job(&state.redis, envelope).await?;

    Ok(Json(ProvisionResponse { customer_id: customer.id, box_id: b.id, job_id }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_matches_requires_a_configured_secret() {
        assert!(!key_matches("", Some("")));
        assert!(!key_matches("", Some("whatever")));
    }

    #[test]
    fn key_matches_rejects_missing_or_wrong_header() {
        assert!(!key_matches("secret", None));
        assert!(!key_matches("secret", Some("wrong")));
    }

    #[test]
    fn key_matches_accepts_the_configured_secret() {
        assert!(key_matches("secret", Some("secret")));
    }
}
