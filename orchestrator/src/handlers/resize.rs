use openclaw_common::types::{BoxStatus, JobEnvelope};
use openclaw_store::{boxes, subscriptions};

use crate::error::Result;
use crate::k8s;
use crate::payloads::ResizePayload;

use super::{box_id, Ctx};

/// Moves a box's namespace onto a new tier's resource quota and container
/// limits, then rolls the deployment so the new limits take effect
/// (spec.md §4.1 `resize`).
pub async fn handle(ctx: &Ctx, envelope: &JobEnvelope) -> Result<()> {
    let payload = ResizePayload::decode(&envelope.payload)?;
    let box_id = box_id(envelope)?;
    let b = boxes::get(&ctx.pool, box_id).await?;

    boxes::set_status(&ctx.pool, box_id, BoxStatus::Updating).await?;

    k8s::ensure_quota(ctx.k8s.clone(), &b.k8s_namespace, payload.tier).await?;
    k8s::patch_deployment_resources(ctx.k8s.clone(), &b.k8s_namespace, payload.tier).await?;
    k8s::wait_for_rollout(ctx.k8s.clone(), &b.k8s_namespace, ctx.rollout_timeout).await?;

    let client = ctx.pool.get().await.map_err(openclaw_store::Error::from)?;
    subscriptions::update_tier_and_limit(
        &client,
        b.subscription_id,
        payload.tier,
        payload.tier.default_tokens_limit(),
    )
    .await?;
    boxes::set_status(&ctx.pool, box_id, BoxStatus::Active).await?;
    Ok(())
}
