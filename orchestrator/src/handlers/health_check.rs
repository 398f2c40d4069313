use openclaw_common::types::JobEnvelope;
use openclaw_store::boxes;

use crate::error::Result;
use crate::k8s;

use super::{box_id, Ctx};

/// Polls the gateway deployment's ready replica count and feeds it into the
/// consecutive-failure counter that flips a box to `unhealthy` after
/// `health_failure_threshold` misses (spec.md §4.1 `health_check`).
pub async fn handle(ctx: &Ctx, envelope: &JobEnvelope) -> Result<()> {
    let box_id = box_id(envelope)?;
    let b = boxes::get(&ctx.pool, box_id).await?;

    let ready = k8s::ready_replicas(ctx.k8s.clone(), &b.k8s_namespace).await? >= 1;
    boxes::record_health_check(&ctx.pool, box_id, ready, ctx.health_failure_threshold).await?;
    if ready {
        boxes::touch_last_seen(&ctx.pool, box_id).await?;
    }
    Ok(())
}
