//! Database query functions for the `erp_connections` table.

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ErpConnection, ErpConnectionStatus, ErpType, MappingHealth};

/// Fields required to register an ERP connection.
#[derive(Debug, Clone, Deserialize)]
pub struct NewErpConnection {
    pub customer_id: Uuid,
    pub erp_type: ErpType,
    pub base_url: String,
    pub database_name: String,
    pub username: String,
    pub password: String,
}

/// Insert a connection in `NOT_CONNECTED` / `UNKNOWN` state.
pub async fn insert_connection(pool: &PgPool, new: &NewErpConnection) -> Result<ErpConnection> {
    let conn = sqlx::query_as::<_, ErpConnection>(
        "INSERT INTO erp_connections (customer_id, erp_type, base_url, database_name, username, password) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(new.customer_id)
    .bind(new.erp_type)
    .bind(new.base_url.trim_end_matches('/'))
    .bind(&new.database_name)
    .bind(&new.username)
    .bind(&new.password)
    .fetch_one(pool)
    .await
    .context("failed to insert ERP connection")?;

    Ok(conn)
}

/// Fetch a connection by ID.
pub async fn get_connection(pool: &PgPool, id: Uuid) -> Result<Option<ErpConnection>> {
    let conn = sqlx::query_as::<_, ErpConnection>("SELECT * FROM erp_connections WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch ERP connection")?;

    Ok(conn)
}

/// List connections, optionally restricted to one customer.
pub async fn list_connections(
    pool: &PgPool,
    customer_id: Option<Uuid>,
) -> Result<Vec<ErpConnection>> {
    let conns = sqlx::query_as::<_, ErpConnection>(
        "SELECT * FROM erp_connections \
         WHERE ($1::uuid IS NULL OR customer_id = $1) \
         ORDER BY created_at DESC",
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
    .context("failed to list ERP connections")?;

    Ok(conns)
}

/// Set the connection status, recording `last_error` (cleared when `None`).
/// Reaching `CONNECTED` re-activates a previously disconnected connection.
pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: ErpConnectionStatus,
    last_error: Option<&str>,
) -> Result<ErpConnection> {
    let conn = sqlx::query_as::<_, ErpConnection>(
        "UPDATE erp_connections \
         SET status = $2, \
             last_error = $3, \
             is_active = is_active OR $2 = 'CONNECTED', \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(status)
    .bind(last_error)
    .fetch_optional(pool)
    .await
    .context("failed to update ERP connection status")?;

    conn.with_context(|| format!("ERP connection {id} not found"))
}

/// Record the outcome of a sync: status, mapping health, error, and (on
/// success) `last_sync_date = now()`.
pub async fn record_sync(
    pool: &PgPool,
    id: Uuid,
    status: ErpConnectionStatus,
    mapping_health: MappingHealth,
    last_error: Option<&str>,
) -> Result<ErpConnection> {
    let conn = sqlx::query_as::<_, ErpConnection>(
        "UPDATE erp_connections \
         SET status = $2, \
             mapping_health = $3, \
             last_error = $4, \
             last_sync_date = CASE WHEN $4::text IS NULL THEN now() ELSE last_sync_date END, \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(status)
    .bind(mapping_health)
    .bind(last_error)
    .fetch_optional(pool)
    .await
    .context("failed to record ERP sync")?;

    conn.with_context(|| format!("ERP connection {id} not found"))
}

/// Mark a connection `DISCONNECTED` and inactive.
pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<Option<ErpConnection>> {
    let conn = sqlx::query_as::<_, ErpConnection>(
        "UPDATE erp_connections \
         SET status = 'DISCONNECTED', is_active = false, updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to deactivate ERP connection")?;

    Ok(conn)
}
