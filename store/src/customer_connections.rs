use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::CustomerConnection;

fn row_to_connection(row: &tokio_postgres::Row) -> CustomerConnection {
    CustomerConnection {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        provider: row.get("provider"),
        connection_id: row.get("connection_id"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    }
}

/// Upserts a customer's connection to `provider`, reactivating it if the
/// customer previously deleted and re-authorized the same provider (the
/// `(customer_id, provider)` unique index means a second authorization is
/// an update, not a new row).
pub async fn upsert(
    pool: &Pool,
    customer_id: Uuid,
    provider: &str,
    connection_id: &str,
) -> Result<CustomerConnection> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO customer_connections (customer_id, provider, connection_id, active)
             VALUES ($1, $2, $3, true)
             ON CONFLICT (customer_id, provider)
             DO UPDATE SET connection_id = EXCLUDED.connection_id, active = true
             RETURNING *",
            &[&customer_id, &provider, &connection_id],
        )
        .await?;
    Ok(row_to_connection(&row))
}

pub async fn list_active_for_customer(
    pool: &Pool,
    customer_id: Uuid,
) -> Result<Vec<CustomerConnection>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT * FROM customer_connections WHERE customer_id = $1 AND active
             ORDER BY provider",
            &[&customer_id],
        )
        .await?;
    Ok(rows.iter().map(row_to_connection).collect())
}

pub async fn deactivate(pool: &Pool, customer_id: Uuid, provider: &str) -> Result<()> {
    let client = pool.get().await?;
    let affected = client
        .execute(
            "UPDATE customer_connections SET active = false
             WHERE customer_id = $1 AND provider = $2 AND active",
            &[&customer_id, &provider],
        )
        .await?;
    if affected == 0 {
        return Err(Error::NotFound);
    }
    Ok(())
}
