//! Database query functions for the `contracts` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Contract, ContractStatus};

/// Fields required to create a contract.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContract {
    pub customer_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub value: f64,
    pub status: Option<ContractStatus>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractUpdate {
    pub title: Option<String>,
    pub value: Option<f64>,
    pub status: Option<ContractStatus>,
    pub end_date: Option<NaiveDate>,
}

/// Insert a contract. Status defaults to `draft`.
pub async fn insert_contract(pool: &PgPool, new: &NewContract) -> Result<Contract> {
    let contract = sqlx::query_as::<_, Contract>(
        "INSERT INTO contracts (customer_id, plan_id, title, value, status, start_date, end_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING *",
    )
    .bind(new.customer_id)
    .bind(new.plan_id)
    .bind(&new.title)
    .bind(new.value)
    .bind(new.status.unwrap_or(ContractStatus::Draft))
    .bind(new.start_date)
    .bind(new.end_date)
    .fetch_one(pool)
    .await
    .context("failed to insert contract")?;

    Ok(contract)
}

/// Fetch a contract by ID.
pub async fn get_contract(pool: &PgPool, id: Uuid) -> Result<Option<Contract>> {
    let contract = sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch contract")?;

    Ok(contract)
}

/// List contracts, newest first, optionally restricted to one customer.
pub async fn list_contracts(pool: &PgPool, customer_id: Option<Uuid>) -> Result<Vec<Contract>> {
    let contracts = sqlx::query_as::<_, Contract>(
        "SELECT * FROM contracts \
         WHERE ($1::uuid IS NULL OR customer_id = $1) \
         ORDER BY created_at DESC",
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
    .context("failed to list contracts")?;

    Ok(contracts)
}

/// Apply a partial update. Returns `None` when the contract does not exist.
pub async fn update_contract(
    pool: &PgPool,
    id: Uuid,
    update: &ContractUpdate,
) -> Result<Option<Contract>> {
    let contract = sqlx::query_as::<_, Contract>(
        "UPDATE contracts SET \
             title = COALESCE($2, title), \
             value = COALESCE($3, value), \
             status = COALESCE($4, status), \
             end_date = COALESCE($5, end_date), \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(&update.title)
    .bind(update.value)
    .bind(update.status)
    .bind(update.end_date)
    .fetch_optional(pool)
    .await
    .context("failed to update contract")?;

    Ok(contract)
}

/// Delete a contract. Returns `false` when no row matched.
pub async fn delete_contract(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete contract")?;

    Ok(result.rows_affected() > 0)
}
