//! `GET/PATCH /v1/boxes/{id}`, `POST /v1/boxes/{id}/suspend|reactivate`,
//! `DELETE /v1/boxes/{id}` — reads and admissible mutations, each mutation
//! enqueuing the matching orchestrator job rather than touching the cluster
//! directly (spec.md §6 `[ADD]`).

use axum::Json;
use axum::extract::{Path, State};
use openclaw_common::rbac::CustomerId;
use openclaw_common::types::{BoxStatus, JobEnvelope, JobType};
use openclaw_store::{boxes, operator_jobs};
use uuid::Uuid;

use crate::dto::{BoxPatchRequest, BoxResponse};
use crate::error::{Error, Result};
use crate::queue::push_job;
use crate::state::AppState;

/// Enforces that the session's customer actually owns the box before
/// returning it — every handler in this module calls this first.
async fn get_owned_box(state: &AppState, customer_id: Uuid, box_id: Uuid) -> Result<openclaw_store::models::Box_> {
    let b = boxes::get(&state.pool, box_id).await?;
    if b.customer_id != customer_id {
        return Err(Error::Store(openclaw_store::Error::NotFound));
    }
    Ok(b)
}

async fn enqueue(
    state: &AppState,
    job_type: JobType,
    customer_id: Uuid,
    box_id: Uuid,
    payload: Option<serde_json::Value>,
) -> Result<Uuid> {
    let job_id = Uuid::new_v4();
    let stored_payload = payload.clone().unwrap_or_else(|| serde_json::json!({}));
    let client = state.pool.get().await.map_err(openclaw_store::Error::from)?;
    operator_jobs::insert_queued(&client, job_id, customer_id, Some(box_id), job_type, &stored_payload).await?;

    let mut envelope = JobEnvelope::new(job_type, customer_id).with_box(box_id);
    if let Some(payload) = payload {
        envelope = envelope.with_payload(payload);
    }
    push_job(&state.redis, envelope).await?;
    Ok(job_id)
}

pub async fn get_box(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path(box_id): Path<Uuid>,
) -> Result<Json<BoxResponse>> {
    let b = get_owned_box(&state, customer_id, box_id).await?;
    Ok(Json(b.into()))
}

pub async fn patch_box(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path(box_id): Path<Uuid>,
    Json(req): Json<BoxPatchRequest>,
) -> Result<Json<BoxResponse>> {
    let b = get_owned_box(&state, customer_id, box_id).await?;
    if !matches!(b.status, BoxStatus::Active) {
        return Err(Error::InvalidState);
    }

    let payload = serde_json::json!({
        "model": req.model,
        "thinking_level": req.thinking_level,
        "system_prompt": req.system_prompt,
    });
    enqueue(&state, JobType::Update, customer_id, box_id, Some(payload)).await?;

    let refreshed = boxes::get(&state.pool, box_id).await?;
    Ok(Json(refreshed.into()))
}

pub async fn suspend_box(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path(box_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let b = get_owned_box(&state, customer_id, box_id).await?;
    if !matches!(b.status, BoxStatus::Active) {
        return Err(Error::InvalidState);
    }
    let job_id = enqueue(&state, JobType::Suspend, customer_id, box_id, None).await?;
    Ok(Json(serde_json::json!({ "job_id": job_id })))
}

pub async fn reactivate_box(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path(box_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let b = get_owned_box(&state, customer_id, box_id).await?;
    if !matches!(b.status, BoxStatus::Suspended) {
        return Err(Error::InvalidState);
    }
    let job_id = enqueue(&state, JobType::Reactivate, customer_id, box_id, None).await?;
    Ok(Json(serde_json::json!({ "job_id": job_id })))
}

pub async fn delete_box(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path(box_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let b = get_owned_box(&state, customer_id, box_id).await?;
    if matches!(b.status, BoxStatus::Destroying | BoxStatus::Destroyed) {
        return Err(Error::InvalidState);
    }
    let job_id = enqueue(&state, JobType::Destroy, customer_id, box_id, None).await?;
    Ok(Json(serde_json::json!({ "job_id": job_id })))
}
