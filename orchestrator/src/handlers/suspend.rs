use openclaw_common::types::{BoxStatus, JobEnvelope};
use openclaw_store::boxes;

use crate::error::Result;
use crate::k8s;

use super::{box_id, Ctx};

/// Scales the gateway deployment to zero replicas without deleting anything,
/// so reactivation is a plain scale-up (spec.md §4.1 `suspend`).
pub async fn handle(ctx: &Ctx, envelope: &JobEnvelope) -> Result<()> {
    let box_id = box_id(envelope)?;
    let b = boxes::get(&ctx.pool, box_id).await?;

    k8s::scale_deployment(ctx.k8s.clone(), &b.k8s_namespace, 0).await?;
    boxes::set_status(&ctx.pool, box_id, BoxStatus::Suspended).await?;
    Ok(())
}
