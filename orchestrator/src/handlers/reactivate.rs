use openclaw_common::types::{BoxStatus, JobEnvelope};
use openclaw_store::boxes;

use crate::error::Result;
use crate::k8s;

use super::{box_id, Ctx};

/// Inverse of `suspend`: scales the gateway deployment back to one replica
/// and waits for it to come ready before marking the box active again
/// (spec.md §4.1 `reactivate`).
pub async fn handle(ctx: &Ctx, envelope: &JobEnvelope) -> Result<()> {
    let box_id = box_id(envelope)?;
    let b = boxes::get(&ctx.pool, box_id).await?;

    k8s::scale_deployment(ctx.k8s.clone(), &b.k8s_namespace, 1).await?;
    k8s::wait_for_pod_ready(ctx.k8s.clone(), &b.k8s_namespace, ctx.pod_ready_timeout).await?;
    boxes::set_status(&ctx.pool, box_id, BoxStatus::Active).await?;
    Ok(())
}
