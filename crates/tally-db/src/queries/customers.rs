//! Database query functions for the `customers` table.

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Customer;

/// Fields required to create a customer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    pub phone: Option<String>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
}

/// Insert a customer. Fails with a unique violation when the email is taken.
pub async fn insert_customer(pool: &PgPool, new: &NewCustomer) -> Result<Customer> {
    let customer = sqlx::query_as::<_, Customer>(
        "INSERT INTO customers (name, email, company, phone) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.company)
    .bind(&new.phone)
    .fetch_one(pool)
    .await
    .context("failed to insert customer")?;

    Ok(customer)
}

/// Fetch a customer by ID.
pub async fn get_customer(pool: &PgPool, id: Uuid) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch customer")?;

    Ok(customer)
}

/// List all customers alphabetically.
pub async fn list_customers(pool: &PgPool) -> Result<Vec<Customer>> {
    let customers = sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY name, email")
        .fetch_all(pool)
        .await
        .context("failed to list customers")?;

    Ok(customers)
}

/// Apply a partial update. Returns `None` when the customer does not exist.
pub async fn update_customer(
    pool: &PgPool,
    id: Uuid,
    update: &CustomerUpdate,
) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        "UPDATE customers SET \
             name = COALESCE($2, name), \
             email = COALESCE($3, email), \
             company = COALESCE($4, company), \
             phone = COALESCE($5, phone), \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(&update.name)
    .bind(&update.email)
    .bind(&update.company)
    .bind(&update.phone)
    .fetch_optional(pool)
    .await
    .context("failed to update customer")?;

    Ok(customer)
}

/// Delete a customer (cascades to plans, contracts, and ERP connections).
/// Returns `false` when no row matched.
pub async fn delete_customer(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete customer")?;

    Ok(result.rows_affected() > 0)
}
