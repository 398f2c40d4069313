use chrono::{DateTime, Utc};
use openclaw_common::types::{BoxStatus, JobStatus, JobType, SubscriptionStatus, Tier};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub tokens_limit: i64,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Box_ {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub subscription_id: Uuid,
    pub bundle_id: Option<Uuid>,
    pub k8s_namespace: String,
    pub telegram_user_ids: Vec<i64>,
    pub language: String,
    pub model: String,
    pub thinking_level: String,
    pub system_prompt: Option<String>,
    pub status: BoxStatus,
    pub health_failures: i32,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub destroyed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ProxyToken {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub box_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct UsageMonthly {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub tokens_used: i64,
    pub tokens_limit: i64,
    pub reset_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct OnboardingSession {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub session_token: String,
    pub state: String,
    pub messages: Value,
    pub derived_config: Option<Value>,
    pub telegram_user_id: Option<i64>,
    pub detected_language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OperatorJob {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub box_id: Option<Uuid>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub payload: Value,
    pub error_log: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CustomerConnection {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider: String,
    pub connection_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Catalog entry driving the onboarding recommender and a box's defaults.
/// Out-of-core (§3), but promoted to a first-class table rather than the
/// hardcoded dict the original keeps, since other entities reference it by
/// id (`Box.bundle_id`, `OnboardingSession.derived_config`).
#[derive(Debug, Clone)]
pub struct Bundle {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub icon: Option<String>,
    pub recommended_providers: Vec<String>,
    pub default_system_prompt: Option<String>,
    pub default_model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn tier_from_row(s: &str) -> Tier {
    Tier::from_str_opt(s).unwrap_or(Tier::Starter)
}

pub(crate) fn subscription_status_from_row(s: &str) -> SubscriptionStatus {
    match s {
        "trialing" => SubscriptionStatus::Trialing,
        "past_due" => SubscriptionStatus::PastDue,
        "suspended" => SubscriptionStatus::Suspended,
        "cancelled" => SubscriptionStatus::Cancelled,
        _ => SubscriptionStatus::Active,
    }
}

pub(crate) fn box_status_from_row(s: &str) -> BoxStatus {
    match s {
        "provisioning" => BoxStatus::Provisioning,
        "active" => BoxStatus::Active,
        "updating" => BoxStatus::Updating,
        "suspended" => BoxStatus::Suspended,
        "unhealthy" => BoxStatus::Unhealthy,
        "destroying" => BoxStatus::Destroying,
        "destroyed" => BoxStatus::Destroyed,
        _ => BoxStatus::Pending,
    }
}

pub(crate) fn job_type_from_row(s: &str) -> JobType {
    match s {
        "update" => JobType::Update,
        "update_connections" => JobType::UpdateConnections,
        "destroy" => JobType::Destroy,
        "suspend" => JobType::Suspend,
        "reactivate" => JobType::Reactivate,
        "resize" => JobType::Resize,
        "health_check" => JobType::HealthCheck,
        _ => JobType::Provision,
    }
}

pub(crate) fn job_status_from_row(s: &str) -> JobStatus {
    match s {
        "running" => JobStatus::Running,
        "complete" => JobStatus::Complete,
        "failed" => JobStatus::Failed,
        _ => JobStatus::Queued,
    }
}
