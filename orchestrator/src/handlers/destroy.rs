use openclaw_common::types::JobEnvelope;
use openclaw_store::{boxes, proxy_tokens};

use crate::error::Result;
use crate::k8s;

use super::{box_id, Ctx};

/// Tears a box down: revoke its proxy token, delete the namespace, mark the
/// row destroyed. Idempotent end-to-end so a retried `destroy` is harmless
/// (spec.md §4.1 `destroy`).
pub async fn handle(ctx: &Ctx, envelope: &JobEnvelope) -> Result<()> {
    let box_id = box_id(envelope)?;
    let b = boxes::get(&ctx.pool, box_id).await?;

    if let Ok(token) = proxy_tokens::get_active_for_box(&ctx.pool, box_id).await {
        ctx.proxy.revoke_token(token.id).await?;
    }

    k8s::delete_namespace(ctx.k8s.clone(), &b.k8s_namespace).await?;
    boxes::mark_destroyed(&ctx.pool, box_id).await?;
    Ok(())
}
