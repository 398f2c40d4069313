//! Request/response DTOs for the external HTTP façade (spec.md §6 "API
//! shell's documented interface").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AuthSessionRequest {
    pub customer_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AuthSessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The literal shape exercised by Concrete Scenario S1.
#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    pub tier: openclaw_common::types::Tier,
    pub telegram_user_id: i64,
    pub customer_email: String,
    #[serde(default)]
    pub bundle_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    pub customer_id: Uuid,
    pub box_id: Uuid,
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BoxResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub subscription_id: Uuid,
    pub bundle_id: Option<Uuid>,
    pub telegram_user_ids: Vec<i64>,
    pub language: String,
    pub model: String,
    pub thinking_level: String,
    pub system_prompt: Option<String>,
    pub status: String,
    pub health_failures: i32,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl From<openclaw_store::models::Box_> for BoxResponse {
    fn from(b: openclaw_store::models::Box_) -> Self {
        Self {
            id: b.id,
            customer_id: b.customer_id,
            subscription_id: b.subscription_id,
            bundle_id: b.bundle_id,
            telegram_user_ids: b.telegram_user_ids,
            language: b.language,
            model: b.model,
            thinking_level: b.thinking_level,
            system_prompt: b.system_prompt,
            status: b.status.as_str().to_string(),
            health_failures: b.health_failures,
            last_seen: b.last_seen,
            created_at: b.created_at,
            activated_at: b.activated_at,
        }
    }
}

/// Admissible PATCH subset per spec.md §4.1: model, thinking level, system
/// prompt. `system_prompt: null` in the JSON body is indistinguishable from
/// "field omitted" under plain `Option`, so this DTO uses the same
/// `Settable` tri-state the orchestrator's `update` job payload uses.
#[derive(Debug, Deserialize, Default)]
pub struct BoxPatchRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub thinking_level: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<openclaw_common::types::Settable<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsageResponse {
    pub tier: String,
    pub tokens_used: i64,
    pub tokens_limit: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use openclaw_common::types::BoxStatus;
    use openclaw_store::models::Box_;

    use super::*;

    #[test]
    fn box_response_carries_the_status_label_through() {
        let now = Utc::now();
        let b = Box_ {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            subscription_id: Uuid::new_v4(),
            bundle_id: None,
            k8s_namespace: "customer-test".to_string(),
            telegram_user_ids: vec![99999],
            language: "en".to_string(),
            model: "kimi-coding/k2p5".to_string(),
            thinking_level: "medium".to_string(),
            system_prompt: None,
            status: BoxStatus::Active,
            health_failures: 0,
            last_seen: None,
            created_at: now,
            activated_at: Some(now),
            last_updated: None,
            destroyed_at: None,
        };

        let resp: BoxResponse = b.into();
        assert_eq!(resp.status, "active");
        assert_eq!(resp.telegram_user_ids, vec![99999]);
    }
}
