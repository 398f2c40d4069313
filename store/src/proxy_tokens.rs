use chrono::Utc;
use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::ProxyToken;

fn row_to_token(row: &tokio_postgres::Row) -> ProxyToken {
    ProxyToken {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        box_id: row.get("box_id"),
        token_hash: row.get("token_hash"),
        created_at: row.get("created_at"),
        revoked_at: row.get("revoked_at"),
    }
}

/// Inserts a pre-hashed proxy token. `token_hash` must already be a bcrypt
/// digest; hashing happens at the call site (the internal mint endpoint),
/// not here, since it's a blocking CPU operation best kept out of the pool.
pub async fn insert(
    pool: &Pool,
    id: Uuid,
    customer_id: Uuid,
    box_id: Uuid,
    token_hash: &str,
) -> Result<ProxyToken> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO proxy_tokens (id, customer_id, box_id, token_hash)
             VALUES ($1, $2, $3, $4) RETURNING *",
            &[&id, &customer_id, &box_id, &token_hash],
        )
        .await?;
    Ok(row_to_token(&row))
}

/// All tokens that have not been revoked. The proxy's auth path scans this
/// list with `bcrypt::verify` on a cache miss, matching the original
/// implementation (no token lookup index exists on the raw secret, since it
/// is never stored — only its hash is).
pub async fn list_active(pool: &Pool) -> Result<Vec<ProxyToken>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT * FROM proxy_tokens WHERE revoked_at IS NULL",
            &[],
        )
        .await?;
    Ok(rows.iter().map(row_to_token).collect())
}

/// The box's current non-revoked token, if it has one. Used by the
/// `destroy` handler to find the token id to revoke via the proxy's
/// internal API before tearing down the namespace.
pub async fn get_active_for_box(pool: &Pool, box_id: Uuid) -> Result<ProxyToken> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT * FROM proxy_tokens WHERE box_id = $1 AND revoked_at IS NULL",
            &[&box_id],
        )
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_token(&row))
}

/// Returns the customer id the now-revoked token belonged to, or
/// `Error::NotFound` if it was already revoked or never existed.
pub async fn revoke(pool: &Pool, token_id: Uuid) -> Result<Uuid> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "UPDATE proxy_tokens SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL
             RETURNING customer_id",
            &[&token_id, &Utc::now()],
        )
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row.get("customer_id"))
}
