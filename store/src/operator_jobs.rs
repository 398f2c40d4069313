use chrono::Utc;
use deadpool_postgres::{GenericClient, Pool};
use openclaw_common::types::{JobStatus, JobType};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{OperatorJob, job_status_from_row, job_type_from_row};

fn row_to_job(row: &tokio_postgres::Row) -> OperatorJob {
    OperatorJob {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        box_id: row.get("box_id"),
        job_type: job_type_from_row(row.get("job_type")),
        status: job_status_from_row(row.get("status")),
        payload: row.get("payload"),
        error_log: row.get("error_log"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
    }
}

/// Writes the audit row for a job before it's pushed onto the Redis queue.
/// `id` is generated by the caller so the same id appears in both the queue
/// envelope and this row.
pub async fn insert_queued<C: GenericClient>(
    client: &C,
    id: Uuid,
    customer_id: Uuid,
    box_id: Option<Uuid>,
    job_type: JobType,
    payload: &Value,
) -> Result<OperatorJob> {
    let row = client
        .query_one(
            "INSERT INTO operator_jobs (id, customer_id, box_id, job_type, payload)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
            &[&id, &customer_id, &box_id, &job_type.as_str(), payload],
        )
        .await?;
    Ok(row_to_job(&row))
}

pub async fn get(pool: &Pool, id: Uuid) -> Result<OperatorJob> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT * FROM operator_jobs WHERE id = $1", &[&id])
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_job(&row))
}

pub async fn mark_running(pool: &Pool, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE operator_jobs SET status = 'running', started_at = $2 WHERE id = $1",
            &[&id, &Utc::now()],
        )
        .await?;
    Ok(())
}

pub async fn mark_complete(pool: &Pool, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE operator_jobs SET status = 'complete', completed_at = $2 WHERE id = $1",
            &[&id, &Utc::now()],
        )
        .await?;
    Ok(())
}

pub async fn mark_failed(pool: &Pool, id: Uuid, error_log: &str) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE operator_jobs SET status = 'failed', error_log = $2, completed_at = $3 WHERE id = $1",
            &[&id, &error_log, &Utc::now()],
        )
        .await?;
    Ok(())
}

pub async fn list_for_customer(pool: &Pool, customer_id: Uuid) -> Result<Vec<OperatorJob>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT * FROM operator_jobs WHERE customer_id = $1 ORDER BY created_at DESC",
            &[&customer_id],
        )
        .await?;
    Ok(rows.iter().map(row_to_job).collect())
}
