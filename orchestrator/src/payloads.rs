//! Per-`JobType` payload shapes. §9's "Dynamic JSON payloads" design note
//! asks for tagged unions decoded at each handler rather than an untyped
//! bag threaded through the dispatch loop, so [`crate::handlers`] decodes
//! one of these from `JobEnvelope.payload` instead of reading raw
//! `serde_json::Value` fields inline.

use openclaw_common::types::{Settable, Tier};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

fn decode<T: for<'de> Deserialize<'de>>(payload: &Option<Value>, job_type: &str) -> Result<T> {
    let value = payload
        .clone()
        .ok_or_else(|| Error::InvalidPayload(format!("{job_type} job requires a payload")))?;
    serde_json::from_value(value)
        .map_err(|e| Error::InvalidPayload(format!("{job_type} payload: {e}")))
}

/// `provision`: the one piece of box config the API shell can't derive from
/// the `boxes` row alone — the customer's own Telegram bot token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionPayload {
    pub bot_token: String,
}

impl ProvisionPayload {
    pub fn decode(payload: &Option<Value>) -> Result<Self> {
        decode(payload, "provision")
    }
}

/// `update`: the admissible PATCH subset from spec.md §4.1 — only fields
/// that are `Some`/`Set` are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePayload {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub thinking_level: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<Settable<String>>,
    #[serde(default)]
    pub telegram_user_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub bot_token: Option<String>,
}

impl UpdatePayload {
    pub fn decode(payload: &Option<Value>) -> Result<Self> {
        match payload {
            None => Ok(Self::default()),
            Some(_) => decode(payload, "update"),
        }
    }
}

/// `resize`: the destination tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizePayload {
    pub tier: Tier,
}

impl ResizePayload {
    pub fn decode(payload: &Option<Value>) -> Result<Self> {
        decode(payload, "resize")
    }
}
