use chrono::Utc;
use deadpool_postgres::{GenericClient, Pool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::Customer;

fn row_to_customer(row: &tokio_postgres::Row) -> Customer {
    Customer {
        id: row.get("id"),
        email: row.get("email"),
        stripe_customer_id: row.get("stripe_customer_id"),
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
    }
}

pub async fn create(pool: &Pool, email: &str) -> Result<Customer> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO customers (email) VALUES ($1) RETURNING *",
            &[&email],
        )
        .await?;
    Ok(row_to_customer(&row))
}

pub async fn get(pool: &Pool, id: Uuid) -> Result<Customer> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT * FROM customers WHERE id = $1", &[&id])
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_customer(&row))
}

pub async fn get_by_email(pool: &Pool, email: &str) -> Result<Customer> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT * FROM customers WHERE email = $1 AND deleted_at IS NULL",
            &[&email],
        )
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_customer(&row))
}

pub async fn get_by_stripe_customer_id(pool: &Pool, stripe_customer_id: &str) -> Result<Customer> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT * FROM customers WHERE stripe_customer_id = $1",
            &[&stripe_customer_id],
        )
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_customer(&row))
}

/// Attaches a Stripe customer id the first time we see it for this
/// customer; idempotent on retry since it only ever writes the same value.
pub async fn set_stripe_customer_id<C: GenericClient>(
    client: &C,
    id: Uuid,
    stripe_customer_id: &str,
) -> Result<()> {
    client
        .execute(
            "UPDATE customers SET stripe_customer_id = $2 WHERE id = $1",
            &[&id, &stripe_customer_id],
        )
        .await?;
    Ok(())
}

pub async fn soft_delete(pool: &Pool, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE customers SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
            &[&id, &Utc::now()],
        )
        .await?;
    Ok(())
}
