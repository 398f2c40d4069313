use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Subscription/billing tier. Determines K8s resource allocation and the
/// default monthly token allowance for a customer's box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Starter,
    Pro,
    Team,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Starter => "starter",
            Tier::Pro => "pro",
            Tier::Team => "team",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "starter" => Some(Tier::Starter),
            "pro" => Some(Tier::Pro),
            "team" => Some(Tier::Team),
            _ => None,
        }
    }

    /// Default monthly token allowance for a subscription on this tier, per
    /// the canonical tier table (§6) — the tier-table-drift open question is
    /// resolved in favor of these values, not the operator test suite's.
    pub fn default_tokens_limit(&self) -> i64 {
        match self {
            Tier::Starter => 1_000_000,
            Tier::Pro => 5_000_000,
            Tier::Team => 20_000_000,
        }
    }

    /// CPU/memory request+limit quadruple, in Kubernetes quantity strings.
    pub fn resources(&self) -> TierResources {
        match self {
            Tier::Starter => TierResources {
                cpu_request: "250m",
                cpu_limit: "500m",
                memory_request: "128Mi",
                memory_limit: "256Mi",
            },
            Tier::Pro => TierResources {
                cpu_request: "500m",
                cpu_limit: "1000m",
                memory_request: "256Mi",
                memory_limit: "512Mi",
            },
            Tier::Team => TierResources {
                cpu_request: "1000m",
                cpu_limit: "2000m",
                memory_request: "512Mi",
                memory_limit: "1Gi",
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TierResources {
    pub cpu_request: &'static str,
    pub cpu_limit: &'static str,
    pub memory_request: &'static str,
    pub memory_limit: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Suspended,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxStatus {
    Pending,
    Provisioning,
    Active,
    Updating,
    Suspended,
    Unhealthy,
    Destroying,
    Destroyed,
}

impl BoxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoxStatus::Pending => "pending",
            BoxStatus::Provisioning => "provisioning",
            BoxStatus::Active => "active",
            BoxStatus::Updating => "updating",
            BoxStatus::Suspended => "suspended",
            BoxStatus::Unhealthy => "unhealthy",
            BoxStatus::Destroying => "destroying",
            BoxStatus::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for BoxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of unit of work an orchestrator replica pulls off `operator:jobs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Provision,
    Update,
    UpdateConnections,
    Destroy,
    Suspend,
    Reactivate,
    Resize,
    HealthCheck,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Provision => "provision",
            JobType::Update => "update",
            JobType::UpdateConnections => "update_connections",
            JobType::Destroy => "destroy",
            JobType::Suspend => "suspend",
            JobType::Reactivate => "reactivate",
            JobType::Resize => "resize",
            JobType::HealthCheck => "health_check",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
    New,
    Greeting,
    GatheringUseCase,
    GatheringTelegram,
    GatheringPreferences,
    RecommendingTier,
    AwaitingPayment,
    Provisioning,
    Complete,
    Failed,
    Abandoned,
}

impl OnboardingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingState::New => "new",
            OnboardingState::Greeting => "greeting",
            OnboardingState::GatheringUseCase => "gathering_use_case",
            OnboardingState::GatheringTelegram => "gathering_telegram",
            OnboardingState::GatheringPreferences => "gathering_preferences",
            OnboardingState::RecommendingTier => "recommending_tier",
            OnboardingState::AwaitingPayment => "awaiting_payment",
            OnboardingState::Provisioning => "provisioning",
            OnboardingState::Complete => "complete",
            OnboardingState::Failed => "failed",
            OnboardingState::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for OnboardingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partial-update field: distinguishes "not supplied" from "explicitly
/// cleared". Mirrors the tri-state semantics connection/update payloads need
/// (e.g. a customer can unset `telegram_user_ids` without touching `model`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "lowercase")]
pub enum Settable<T> {
    Set(T),
    Unset,
}

impl<T> Settable<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Settable::Set(v) => Some(v),
            Settable::Unset => None,
        }
    }
}

/// Envelope pushed onto the `operator:jobs` Redis list (RPUSH) and popped by
/// the orchestrator (BLPOP). `payload` is a tagged union keyed by `job_type`;
/// components other than the orchestrator should not need to interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub customer_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub box_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<serde_json::Value>,
}

impl JobEnvelope {
    pub fn new(job_type: JobType, customer_id: Uuid) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            job_type,
            customer_id,
            box_id: None,
            payload: None,
        }
    }

    pub fn with_box(mut self, box_id: Uuid) -> Self {
        self.box_id = Some(box_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Fields carried on a `usage:events` Redis Stream entry (XADD), one per
/// metered LLM proxy request. Streams store flat string fields, so these are
/// serialized/deserialized as strings at the Redis boundary, not as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEventFields {
    pub customer_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub box_id: Option<Uuid>,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request_id: Option<String>,
}

pub mod annotations {
    pub const CUSTOMER: &str = "openclaw/customer";
    pub const TIER: &str = "openclaw/tier";
    pub const MANAGED_BY: &str = "openclaw/managed-by";
}

pub const MANAGER_NAME: &str = "openclaw-operator";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_round_trips_through_serde() {
        let t = Tier::Pro;
        let s = serde_json::to_string(&t).unwrap();
        assert_eq!(s, "\"pro\"");
        let back: Tier = serde_json::from_str(&s).unwrap();
        assert_eq!(back, Tier::Pro);
    }

    #[test]
    fn tier_resources_scale_with_tier() {
        assert_eq!(Tier::Starter.resources().cpu_request, "250m");
        assert_eq!(Tier::Pro.resources().cpu_request, "500m");
        assert_eq!(Tier::Team.resources().cpu_request, "1000m");
    }

    #[test]
    fn tier_token_limits_match_canonical_table() {
        assert_eq!(Tier::Starter.default_tokens_limit(), 1_000_000);
        assert_eq!(Tier::Pro.default_tokens_limit(), 5_000_000);
        assert_eq!(Tier::Team.default_tokens_limit(), 20_000_000);
    }

    #[test]
    fn job_envelope_serializes_optional_fields_only_when_present() {
        let env = JobEnvelope::new(JobType::Suspend, Uuid::nil());
        let v = serde_json::to_value(&env).unwrap();
        assert!(v.get("box_id").is_none());
        assert!(v.get("payload").is_none());
    }

    #[test]
    fn settable_unset_is_distinct_from_absent() {
        let unset: Settable<i64> = Settable::Unset;
        let v = serde_json::to_value(&unset).unwrap();
        assert_eq!(v["op"], "unset");
    }
}
