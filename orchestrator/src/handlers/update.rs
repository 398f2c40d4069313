use std::collections::BTreeMap;

use chrono::Utc;
use openclaw_common::types::{BoxStatus, JobEnvelope};
use openclaw_store::boxes;

use crate::error::Result;
use crate::k8s;
use crate::payloads::UpdatePayload;

use super::{box_id, Ctx};

/// `active → updating → active`: patches the supplied env subset, rolls the
/// deployment, and waits for it to converge (spec.md §4.1 `update`).
pub async fn handle(ctx: &Ctx, envelope: &JobEnvelope) -> Result<()> {
    let payload = UpdatePayload::decode(&envelope.payload)?;
    let box_id = box_id(envelope)?;
    let b = boxes::get(&ctx.pool, box_id).await?;

    boxes::set_status(&ctx.pool, box_id, BoxStatus::Updating).await?;

    let mut keys = BTreeMap::new();
    if let Some(model) = &payload.model {
        keys.insert("OPENCLAW_MODEL".to_string(), model.clone());
    }
    if let Some(level) = &payload.thinking_level {
        keys.insert("OPENCLAW_THINKING_LEVEL".to_string(), level.clone());
    }
    if let Some(prompt) = &payload.system_prompt {
        keys.insert(
            "OPENCLAW_SYSTEM_PROMPT".to_string(),
            prompt.clone().into_option().unwrap_or_default(),
        );
    }
    if let Some(ids) = &payload.telegram_user_ids {
        keys.insert(
            "TELEGRAM_ALLOWED_USER_IDS".to_string(),
            ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(","),
        );
    }
    if let Some(token) = &payload.bot_token {
        keys.insert("TELEGRAM_BOT_TOKEN".to_string(), token.clone());
    }

    if !keys.is_empty() {
        k8s::patch_secret_keys(ctx.k8s.clone(), &b.k8s_namespace, keys).await?;
    }
    k8s::trigger_rollout_restart(ctx.k8s.clone(), &b.k8s_namespace, Utc::now().to_rfc3339()).await?;
    k8s::wait_for_rollout(ctx.k8s.clone(), &b.k8s_namespace, ctx.rollout_timeout).await?;

    let new_prompt = match &payload.system_prompt {
        Some(openclaw_common::types::Settable::Set(v)) => Some(v.as_str()),
        _ => None,
    };
    boxes::update_config(
        &ctx.pool,
        box_id,
        payload.model.as_deref(),
        payload.thinking_level.as_deref(),
        new_prompt,
        payload.telegram_user_ids.as_deref(),
    )
    .await?;
    if matches!(payload.system_prompt, Some(openclaw_common::types::Settable::Unset)) {
        boxes::clear_system_prompt(&ctx.pool, box_id).await?;
    }
    boxes::mark_updated(&ctx.pool, box_id).await?;
    boxes::set_status(&ctx.pool, box_id, BoxStatus::Active).await?;
    Ok(())
}
