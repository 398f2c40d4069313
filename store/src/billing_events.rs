use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;

use crate::error::Result;

/// Claims a billing provider event id for processing under `client`'s
/// transaction. Returns `true` if this id has already been durably
/// processed (`processed_at IS NOT NULL`) — the caller should skip its
/// handler and roll back. Returns `false` the first time (or on a retry of
/// a delivery whose handler previously failed, since `processed_at` is only
/// ever set once the caller commits): the caller should run its handler and
/// then call [`mark_processed`] inside the same transaction before
/// committing.
///
/// The initial `INSERT ... ON CONFLICT DO NOTHING` followed by `SELECT ...
/// FOR UPDATE` serializes a concurrent second delivery of the same id
/// behind whichever caller's transaction got there first — the second
/// caller's `SELECT` blocks until the first commits or rolls back, so it
/// always observes the first attempt's true outcome rather than racing it.
/// Unlike a claim-then-release-the-lock-immediately scheme, the lock (and
/// the row insert) lives inside the *same* transaction as the handler's
/// mutations and `mark_processed`, so a handler failure rolls everything —
/// claim included — back together, leaving the id unclaimed for the
/// provider's retry to reprocess from scratch.
pub async fn claim<C: GenericClient>(client: &C, event_id: &str, event_type: &str) -> Result<bool> {
    client
        .execute(
            "INSERT INTO billing_events (id, event_type) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            &[&event_id, &event_type],
        )
        .await?;

    let row = client
        .query_one(
            "SELECT processed_at FROM billing_events WHERE id = $1 FOR UPDATE",
            &[&event_id],
        )
        .await?;
    let processed_at: Option<DateTime<Utc>> = row.get(0);
    Ok(processed_at.is_some())
}

pub async fn mark_processed<C: GenericClient>(client: &C, event_id: &str) -> Result<()> {
    client
        .execute(
            "UPDATE billing_events SET processed_at = now() WHERE id = $1",
            &[&event_id],
        )
        .await?;
    Ok(())
}
