//! Database query functions for the `partners` table.

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Partner;

/// Fields required to create a partner.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPartner {
    pub name: String,
    pub email: String,
    pub specialty: Option<String>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartnerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub specialty: Option<String>,
}

/// Insert a partner. Fails with a unique violation when the email is taken.
pub async fn insert_partner(pool: &PgPool, new: &NewPartner) -> Result<Partner> {
    let partner = sqlx::query_as::<_, Partner>(
        "INSERT INTO partners (name, email, specialty) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.specialty)
    .fetch_one(pool)
    .await
    .context("failed to insert partner")?;

    Ok(partner)
}

/// Fetch a partner by ID.
pub async fn get_partner(pool: &PgPool, id: Uuid) -> Result<Option<Partner>> {
    let partner = sqlx::query_as::<_, Partner>("SELECT * FROM partners WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch partner")?;

    Ok(partner)
}

/// List all partners alphabetically.
pub async fn list_partners(pool: &PgPool) -> Result<Vec<Partner>> {
    let partners = sqlx::query_as::<_, Partner>("SELECT * FROM partners ORDER BY name, email")
        .fetch_all(pool)
        .await
        .context("failed to list partners")?;

    Ok(partners)
}

/// Apply a partial update. Returns `None` when the partner does not exist.
pub async fn update_partner(
    pool: &PgPool,
    id: Uuid,
    update: &PartnerUpdate,
) -> Result<Option<Partner>> {
    let partner = sqlx::query_as::<_, Partner>(
        "UPDATE partners SET \
             name = COALESCE($2, name), \
             email = COALESCE($3, email), \
             specialty = COALESCE($4, specialty), \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(&update.name)
    .bind(&update.email)
    .bind(&update.specialty)
    .fetch_optional(pool)
    .await
    .context("failed to update partner")?;

    Ok(partner)
}

/// Delete a partner. Assignments routed to it keep their row with a null
/// `partner_id`.
/// Returns `false` when no row matched.
pub async fn delete_partner(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM partners WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete partner")?;

    Ok(result.rows_affected() > 0)
}
