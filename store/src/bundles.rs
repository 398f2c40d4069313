use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::Bundle;

fn row_to_bundle(row: &tokio_postgres::Row) -> Bundle {
    Bundle {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        icon: row.get("icon"),
        recommended_providers: row.get("recommended_providers"),
        default_system_prompt: row.get("default_system_prompt"),
        default_model: row.get("default_model"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn get(pool: &Pool, id: Uuid) -> Result<Bundle> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT * FROM bundles WHERE id = $1", &[&id])
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_bundle(&row))
}

pub async fn get_by_slug(pool: &Pool, slug: &str) -> Result<Bundle> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT * FROM bundles WHERE slug = $1", &[&slug])
        .await?
        .ok_or(Error::NotFound)?;
    Ok(row_to_bundle(&row))
}

pub async fn list(pool: &Pool) -> Result<Vec<Bundle>> {
    let client = pool.get().await?;
    let rows = client
        .query("SELECT * FROM bundles ORDER BY name", &[])
        .await?;
    Ok(rows.iter().map(row_to_bundle).collect())
}

#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &Pool,
    slug: &str,
    name: &str,
    icon: Option<&str>,
    recommended_providers: &[String],
    default_system_prompt: Option<&str>,
    default_model: &str,
) -> Result<Bundle> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO bundles (slug, name, icon, recommended_providers, default_system_prompt, default_model)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
            &[
                &slug,
                &name,
                &icon,
                &recommended_providers,
                &default_system_prompt,
                &default_model,
            ],
        )
        .await?;
    Ok(row_to_bundle(&row))
}
