use chrono::Utc;
use deadpool_postgres::Pool;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::OnboardingSession;

fn row_to_session(row: &tokio_postgres::Row) -> OnboardingSession {
    OnboardingSession {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        session_token: row.get("session_token"),
        state: row.get("state"),
        messages: row.get("messages"),
        derived_config: row.get("derived_config"),
        telegram_user_id: row.get("telegram_user_id"),
        detected_language: row.get("detected_language"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        expires_at: row.get("expires_at"),
    }
}

pub async fn create(pool: &Pool, session_token: &str) -> Result<OnboardingSession> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO onboarding_sessions (session_token) VALUES ($1) RETURNING *",
            &[&session_token],
        )
        .await?;
    Ok(row_to_session(&row))
}

pub async fn get_by_token(pool: &Pool, session_token: &str) -> Result<OnboardingSession> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT * FROM onboarding_sessions WHERE session_token = $1",
            &[&session_token],
        )
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_session(&row))
}

/// Appends a chat turn and bumps `updated_at`. `messages` is stored as a
/// JSON array; the caller passes the full array to avoid json-path quirks
/// across the driver's parameter encoding.
pub async fn append_messages(pool: &Pool, id: Uuid, messages: &Value) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE onboarding_sessions SET messages = $2, updated_at = now() WHERE id = $1",
            &[&id, messages],
        )
        .await?;
    Ok(())
}

pub async fn transition_state(pool: &Pool, id: Uuid, state: &str) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE onboarding_sessions SET state = $2, updated_at = now() WHERE id = $1",
            &[&id, &state],
        )
        .await?;
    Ok(())
}

pub async fn set_telegram_user_id(pool: &Pool, id: Uuid, telegram_user_id: i64) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE onboarding_sessions SET telegram_user_id = $2, updated_at = now() WHERE id = $1",
            &[&id, &telegram_user_id],
        )
        .await?;
    Ok(())
}

pub async fn set_detected_language(pool: &Pool, id: Uuid, language: &str) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE onboarding_sessions SET detected_language = $2, updated_at = now() WHERE id = $1",
            &[&id, &language],
        )
        .await?;
    Ok(())
}

pub async fn set_derived_config(pool: &Pool, id: Uuid, derived_config: &Value) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE onboarding_sessions SET derived_config = $2, updated_at = now() WHERE id = $1",
            &[&id, derived_config],
        )
        .await?;
    Ok(())
}

/// Links a session to the customer created once payment succeeds.
pub async fn attach_customer(pool: &Pool, id: Uuid, customer_id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE onboarding_sessions SET customer_id = $2, updated_at = now() WHERE id = $1",
            &[&id, &customer_id],
        )
        .await?;
    Ok(())
}

/// Sessions abandoned past their expiry, for the periodic sweep a future
/// cleanup job could run; not currently invoked by any binary.
pub async fn list_expired(pool: &Pool) -> Result<Vec<OnboardingSession>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT * FROM onboarding_sessions
             WHERE expires_at < now() AND state NOT IN ('complete', 'failed', 'abandoned')",
            &[],
        )
        .await?;
    Ok(rows.iter().map(row_to_session).collect())
}
