use openclaw_common::streams::ConnectionsDocument;
use openclaw_common::types::{BoxStatus, JobEnvelope};
use openclaw_store::{boxes, subscriptions};

use crate::error::Result;
use crate::k8s::{self, BoxSecretEnv};
use crate::payloads::ProvisionPayload;

use super::{box_id, Ctx};

/// `pending → provisioning → active` (spec.md §4.1 steps 1-8).
pub async fn handle(ctx: &Ctx, envelope: &JobEnvelope) -> Result<()> {
    let payload = ProvisionPayload::decode(&envelope.payload)?;
    let box_id = box_id(envelope)?;

    let b = boxes::get(&ctx.pool, box_id).await?;
    let sub = subscriptions::get(&ctx.pool, b.subscription_id).await?;

    boxes::set_status(&ctx.pool, box_id, BoxStatus::Provisioning).await?;

    let minted = ctx.proxy.mint_token(envelope.customer_id, box_id).await?;

    k8s::ensure_namespace(ctx.k8s.clone(), &b.k8s_namespace, envelope.customer_id, sub.tier).await?;

    let connections_json = serde_json::to_string(&ConnectionsDocument {
        broker_url: ctx.connections_document.broker_url.clone(),
        broker_secret: ctx.connections_document.broker_secret.clone(),
        api_url: ctx.connections_document.api_url.clone(),
        api_secret: ctx.connections_document.api_secret.clone(),
        customer_id: envelope.customer_id,
        web_url: ctx.connections_document.web_url.clone(),
        connections: Vec::new(),
    })
    .unwrap_or_default();
    k8s::ensure_secret(
        ctx.k8s.clone(),
        &b.k8s_namespace,
        BoxSecretEnv {
            bot_token: Some(payload.bot_token),
            telegram_user_ids: Some(b.telegram_user_ids.clone()),
            proxy_token: Some(minted.token),
            proxy_base_url: Some(ctx.proxy_base_url.clone()),
            model: Some(b.model.clone()),
            thinking_level: Some(b.thinking_level.clone()),
            system_prompt: b.system_prompt.clone(),
            connections_json: Some(connections_json),
        },
    )
    .await?;

    k8s::ensure_quota(ctx.k8s.clone(), &b.k8s_namespace, sub.tier).await?;
    k8s::ensure_network_policy(ctx.k8s.clone(), &b.k8s_namespace, &ctx.platform_egress_cidrs).await?;
    k8s::ensure_deployment(ctx.k8s.clone(), &b.k8s_namespace, &ctx.box_image, sub.tier, None).await?;

    k8s::wait_for_pod_ready(ctx.k8s.clone(), &b.k8s_namespace, ctx.pod_ready_timeout).await?;

    boxes::mark_activated(&ctx.pool, box_id).await?;
    Ok(())
}
