use openclaw_common::streams::JOB_QUEUE;
use openclaw_common::types::JobEnvelope;
use redis::AsyncCommands;

use crate::error::{Error, Result};

pub async fn push_job(redis: &deadpool_redis::Pool, envelope: JobEnvelope) -> Result<()> {
    let raw = serde_json::to_string(&envelope).map_err(|e| Error::Other(e.into()))?;
    let mut conn = redis.get().await.map_err(|e| Error::Other(e.into()))?;
    let _: () = conn.rpush(JOB_QUEUE, raw).await.map_err(|e| Error::Other(e.into()))?;
    Ok(())
}
