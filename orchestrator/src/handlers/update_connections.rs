use std::collections::BTreeMap;

use chrono::Utc;
use openclaw_common::streams::{ConnectionEntry, ConnectionsDocument, ProviderWiring, wiring_for_provider};
use openclaw_common::types::JobEnvelope;
use openclaw_store::{boxes, customer_connections};

use crate::error::Result;
use crate::k8s;

use super::Ctx;

/// Rebuilds `OPENCLAW_CONNECTIONS` from the customer's currently-active
/// connections and rolls the deployment (spec.md §4.1 `update_connections`).
pub async fn handle(ctx: &Ctx, envelope: &JobEnvelope) -> Result<()> {
    let client = ctx.pool.get().await.map_err(openclaw_store::Error::from)?;
    let b = boxes::get_active_for_customer(&client, envelope.customer_id).await?;
    let active = customer_connections::list_active_for_customer(&ctx.pool, envelope.customer_id).await?;

    let connections = active
        .into_iter()
        .map(|c| match wiring_for_provider(&c.provider) {
            ProviderWiring::Native(env_var) => ConnectionEntry {
                provider: c.provider,
                connection_id: c.connection_id,
                native_env: Some(env_var.to_string()),
                mcp: None,
            },
            ProviderWiring::Mcp(descriptor) => ConnectionEntry {
                provider: c.provider,
                connection_id: c.connection_id,
                native_env: None,
                mcp: Some(descriptor),
            },
        })
        .collect();

    let doc = ConnectionsDocument {
        broker_url: ctx.connections_document.broker_url.clone(),
        broker_secret: ctx.connections_document.broker_secret.clone(),
        api_url: ctx.connections_document.api_url.clone(),
        api_secret: ctx.connections_document.api_secret.clone(),
        customer_id: envelope.customer_id,
        web_url: ctx.connections_document.web_url.clone(),
        connections,
    };
    let connections_json = serde_json::to_string(&doc)
        .map_err(|e| crate::error::Error::InvalidPayload(format!("failed to serialize connections: {e}")))?;

    let mut keys = BTreeMap::new();
    keys.insert("OPENCLAW_CONNECTIONS".to_string(), connections_json);
    k8s::patch_secret_keys(ctx.k8s.clone(), &b.k8s_namespace, keys).await?;
    k8s::trigger_rollout_restart(ctx.k8s.clone(), &b.k8s_namespace, Utc::now().to_rfc3339()).await?;
    k8s::wait_for_rollout(ctx.k8s.clone(), &b.k8s_namespace, ctx.rollout_timeout).await?;

    boxes::mark_updated(&ctx.pool, b.id).await?;
    Ok(())
}
