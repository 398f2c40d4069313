//! Minimal typed views onto the billing provider's webhook payloads — only
//! the fields each handler actually reads, not a full API mirror. Unknown
//! fields are ignored by `serde_json`'s default behavior.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub subscription: String,
    pub customer: String,
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutMetadata {
    pub openclaw_customer_id: Option<String>,
    pub tier: Option<String>,
    pub telegram_user_id: Option<String>,
    pub bot_token: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceObject {
    pub subscription: Option<String>,
    #[serde(default)]
    pub billing_reason: Option<String>,
    #[serde(default)]
    pub attempt_count: Option<i64>,
    pub period_start: i64,
    pub period_end: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    #[serde(default)]
    pub metadata: SubscriptionMetadata,
    pub current_period_start: i64,
    pub current_period_end: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionMetadata {
    pub tier: Option<String>,
}
