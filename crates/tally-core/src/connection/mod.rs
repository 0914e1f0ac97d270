//! ERP connection lifecycle: reconnect, sync, disconnect.
//!
//! Status transitions are written to `erp_connections` so the console shows
//! the outcome of the last attempt, including its error text.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use tally_db::models::{ErpConnection, ErpConnectionStatus, ErpType, MappingHealth};
use tally_db::queries::erp_connections as conn_queries;

use crate::erp::{DateRange, ErpCredentials, ErpError, ErpGateway, Ledger};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("ERP connection {0} not found")]
    NotFound(Uuid),

    #[error("ERP connection {0} is not active")]
    Inactive(Uuid),

    #[error(transparent)]
    Erp(#[from] ErpError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

async fn load(pool: &PgPool, id: Uuid) -> Result<ErpConnection, ConnectionError> {
    conn_queries::get_connection(pool, id)
        .await?
        .ok_or(ConnectionError::NotFound(id))
}

fn ensure_supported(conn: &ErpConnection) -> Result<(), ConnectionError> {
    match conn.erp_type {
        ErpType::Odoo => Ok(()),
        other => Err(ErpError::UnsupportedErpType(other).into()),
    }
}

/// Credentials for an active, supported connection.
pub async fn active_credentials(
    pool: &PgPool,
    id: Uuid,
) -> Result<(ErpConnection, ErpCredentials), ConnectionError> {
    let conn = load(pool, id).await?;
    if !conn.is_active {
        return Err(ConnectionError::Inactive(id));
    }
    ensure_supported(&conn)?;
    let creds = ErpCredentials::from(&conn);
    Ok((conn, creds))
}

/// Re-authenticate against the ERP and record the outcome.
///
/// An authentication failure is stored on the connection (`ERROR` plus the
/// message) and also returned.
pub async fn reconnect(
    pool: &PgPool,
    gateway: &dyn ErpGateway,
    id: Uuid,
) -> Result<ErpConnection, ConnectionError> {
    let conn = load(pool, id).await?;
    ensure_supported(&conn)?;
    conn_queries::set_status(pool, id, ErpConnectionStatus::Connecting, None).await?;

    match gateway.verify(&ErpCredentials::from(&conn)).await {
        Ok(()) => {
            let conn = conn_queries::set_status(pool, id, ErpConnectionStatus::Connected, None).await?;
            info!(connection_id = %id, "ERP connection established");
            Ok(conn)
        }
        Err(e) => {
            let message = e.to_string();
            conn_queries::set_status(pool, id, ErpConnectionStatus::Error, Some(&message)).await?;
            warn!(connection_id = %id, error = %message, "ERP reconnect failed");
            Err(e.into())
        }
    }
}

/// Pull the revenue ledger for `range` as a health check of the mapping.
///
/// Success marks the mapping healthy and stamps `last_sync_date`; failure
/// marks it degraded and records the error.
pub async fn sync(
    pool: &PgPool,
    gateway: &dyn ErpGateway,
    id: Uuid,
    range: &DateRange,
) -> Result<ErpConnection, ConnectionError> {
    let (_, creds) = active_credentials(pool, id).await?;

    match gateway.ledger_total(&creds, Ledger::Revenue, range).await {
        Ok(revenue) => {
            let conn = conn_queries::record_sync(
                pool,
                id,
                ErpConnectionStatus::Connected,
                MappingHealth::Healthy,
                None,
            )
            .await?;
            info!(connection_id = %id, %range, revenue, "ERP sync complete");
            Ok(conn)
        }
        Err(e) => {
            let message = e.to_string();
            conn_queries::record_sync(
                pool,
                id,
                ErpConnectionStatus::Error,
                MappingHealth::Degraded,
                Some(&message),
            )
            .await?;
            warn!(connection_id = %id, error = %message, "ERP sync failed");
            Err(e.into())
        }
    }
}

/// Mark a connection disconnected and inactive.
pub async fn disconnect(pool: &PgPool, id: Uuid) -> Result<ErpConnection, ConnectionError> {
    let conn = conn_queries::deactivate(pool, id)
        .await?
        .ok_or(ConnectionError::NotFound(id))?;
    info!(connection_id = %id, "ERP connection disconnected");
    Ok(conn)
}
