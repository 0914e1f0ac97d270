//! `tally serve`: the back-office HTTP API.
//!
//! Every response uses the envelope `{success: true, data}` or
//! `{success: false, error}`.

mod contracts;
mod customers;
mod erp;
mod partners;
mod plans;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tally_core::connection::ConnectionError;
use tally_core::erp::{ErpError, ErpGateway};
use tally_core::notify::Notifier;
use tally_core::plan::PlanError;

/// Shared handler state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub erp: Arc<dyn ErpGateway>,
    pub notifier: Arc<dyn Notifier>,
}

// ---------------------------------------------------------------------------
// Envelope and error type
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope { success: true, data }).into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(Envelope { success: true, data })).into_response()
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    /// Map a query error: unique violations are conflicts, foreign-key
    /// violations are bad requests, anything else is a 500.
    pub fn database(err: anyhow::Error) -> Self {
        if tally_db::is_unique_violation(&err) {
            return Self {
                status: StatusCode::CONFLICT,
                message: format!("{err:#}"),
            };
        }
        if tally_db::is_foreign_key_violation(&err) {
            return Self::bad_request(format!("{err:#}"));
        }
        Self::internal(err)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::Validation(e) => Self::bad_request(e.to_string()),
            PlanError::CustomerNotFound(_) => Self::not_found(err.to_string()),
            PlanError::Database(e) => Self::database(e),
        }
    }
}

impl From<ConnectionError> for AppError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::NotFound(_) => Self::not_found(err.to_string()),
            ConnectionError::Inactive(_) => Self::bad_request(err.to_string()),
            ConnectionError::Erp(ErpError::UnsupportedErpType(_)) => {
                Self::bad_request(err.to_string())
            }
            ConnectionError::Erp(e) => Self::internal(e.into()),
            ConnectionError::Database(e) => Self::database(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .merge(customers::routes())
        .merge(partners::routes())
        .merge(plans::routes())
        .merge(contracts::routes())
        .merge(erp::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("tally serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("tally serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

async fn health() -> Response {
    ok(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
