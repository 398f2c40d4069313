//! Key/stream naming and wire-level payload contracts shared by the
//! orchestrator, billing reducer and metered proxy, all of which talk to the
//! same Redis instance but never to each other directly.

use serde::{Deserialize, Serialize};

/// At-least-once FIFO job queue. Producers `RPUSH` a [`crate::types::JobEnvelope`],
/// the orchestrator `BLPOP`s it.
pub const JOB_QUEUE: &str = "operator:jobs";

/// Per-customer distributed lock key prefix: `operator:lock:{customer_id}`.
pub const LOCK_KEY_PREFIX: &str = "operator:lock:";

/// Lock lease duration, in seconds.
pub const LOCK_LEASE_SECONDS: u64 = 300;

/// Max time a handler will wait to acquire a customer's lock before giving up.
pub const LOCK_ACQUIRE_TIMEOUT_SECONDS: u64 = 30;

/// Append-only usage event stream (Redis Streams / XADD).
pub const USAGE_STREAM: &str = "usage:events";

/// Consumer group all proxy replicas share when draining [`USAGE_STREAM`].
pub const USAGE_CONSUMER_GROUP: &str = "proxy-consumers";

/// Consumer name used by every proxy replica. A single logical pool, not
/// per-replica, matching the original implementation's single-writer design.
pub const USAGE_CONSUMER_NAME: &str = "proxy-worker";

/// Default batch-flush thresholds for the usage stream consumer.
pub const USAGE_FLUSH_BATCH_SIZE: usize = 100;
pub const USAGE_FLUSH_INTERVAL_SECONDS: u64 = 5;

/// Cache entry for an authenticated proxy token: `proxy_token:{raw_token}`.
pub const PROXY_TOKEN_CACHE_PREFIX: &str = "proxy_token:";
pub const PROXY_TOKEN_CACHE_TTL_SECONDS: u64 = 300;

/// Cache entry for a customer's current-period usage snapshot: `limit:{customer_id}`.
pub const USAGE_LIMIT_CACHE_PREFIX: &str = "limit:";
pub const USAGE_LIMIT_CACHE_TTL_SECONDS: u64 = 60;

/// Fraction of the monthly token limit at which the proxy starts sending
/// `X-Token-Warning: 90%` on successful responses.
pub const USAGE_WARNING_THRESHOLD: f64 = 0.9;

/// Per-customer token-bucket rate limit key: `ratelimit:{customer_id}`.
pub const RATE_LIMIT_KEY_PREFIX: &str = "ratelimit:";

pub mod topics {
    pub mod subjects {
        pub fn customer(id: &str) -> String {
            format!("openclaw.customer.{id}")
        }
    }
}

/// How a box reaches an MCP-fronted provider: a local sidecar process over
/// stdio, or a remote HTTP(S) endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum McpDescriptor {
    Stdio { command: String },
    Http { url: String },
}

/// One entry in the `connections` array of the `OPENCLAW_CONNECTIONS`
/// document (spec.md §4.1 `update_connections`): either a `native_env`
/// naming the env var the in-box agent already reads for this provider, or
/// an `mcp` descriptor for providers only reachable through a sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub provider: String,
    pub connection_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub native_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mcp: Option<McpDescriptor>,
}

/// The JSON document patched into the `OPENCLAW_CONNECTIONS` secret key by
/// the `update_connections` job, per spec.md §4.1's literal field list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionsDocument {
    pub broker_url: String,
    pub broker_secret: String,
    pub api_url: String,
    pub api_secret: String,
    pub customer_id: uuid::Uuid,
    pub web_url: String,
    pub connections: Vec<ConnectionEntry>,
}

/// Provider descriptor this workspace knows how to wire up: either a named
/// env var the box's runtime already reads natively, or an MCP sidecar
/// transport. Providers absent from this table fall back to a native env
/// var derived from the provider name (`PROVIDER_CONNECTION_ID`-style),
/// matching the original's "everything unlisted is native" default.
pub enum ProviderWiring {
    Native(&'static str),
    Mcp(McpDescriptor),
}

/// Resolves how `provider` should be surfaced to the box: a native env var
/// name, or an MCP descriptor (stdio command or HTTP url) for providers
/// fronted by a sidecar.
pub fn wiring_for_provider(provider: &str) -> ProviderWiring {
    match provider {
        "github" => ProviderWiring::Mcp(McpDescriptor::Stdio { command: "mcp-github".to_string() }),
        "slack" => ProviderWiring::Mcp(McpDescriptor::Stdio { command: "mcp-slack".to_string() }),
        "google-drive" => ProviderWiring::Mcp(McpDescriptor::Http { url: "http://localhost:7401/mcp".to_string() }),
        "notion" => ProviderWiring::Mcp(McpDescriptor::Http { url: "http://localhost:7402/mcp".to_string() }),
        "telegram" => ProviderWiring::Native("TELEGRAM_BOT_TOKEN"),
        other => ProviderWiring::Native(match other {
            "discord" => "DISCORD_BOT_TOKEN",
            _ => "OPENCLAW_CONNECTION_TOKEN",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_provider_resolves_to_mcp_descriptor() {
        assert!(matches!(wiring_for_provider("github"), ProviderWiring::Mcp(McpDescriptor::Stdio { .. })));
        assert!(matches!(wiring_for_provider("notion"), ProviderWiring::Mcp(McpDescriptor::Http { .. })));
    }

    #[test]
    fn unknown_provider_falls_back_to_native() {
        assert!(matches!(wiring_for_provider("custom-webhook"), ProviderWiring::Native(_)));
    }

    #[test]
    fn connections_document_round_trips_optional_fields() {
        let doc = ConnectionsDocument {
            broker_url: "https://broker.example".to_string(),
            broker_secret: "s".to_string(),
            api_url: "https://api.example".to_string(),
            api_secret: "s".to_string(),
            customer_id: uuid::Uuid::nil(),
            web_url: "https://app.example".to_string(),
            connections: vec![
                ConnectionEntry {
                    provider: "github".to_string(),
                    connection_id: "conn_1".to_string(),
                    native_env: None,
                    mcp: Some(McpDescriptor::Stdio { command: "mcp-github".to_string() }),
                },
                ConnectionEntry {
                    provider: "telegram".to_string(),
                    connection_id: "conn_2".to_string(),
                    native_env: Some("TELEGRAM_BOT_TOKEN".to_string()),
                    mcp: None,
                },
            ],
        };
        let v = serde_json::to_value(&doc).unwrap();
        assert!(v["connections"][0].get("native_env").is_none());
        assert!(v["connections"][1].get("mcp").is_none());
    }
}
