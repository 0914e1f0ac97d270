use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use tally_db::queries::customers::{self as customer_db, CustomerUpdate, NewCustomer};

use super::{AppError, AppState, created, ok};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list).post(create))
        .route("/api/customers/{id}", get(show).put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> Result<Response, AppError> {
    let customers = customer_db::list_customers(&state.pool)
        .await
        .map_err(AppError::internal)?;
    Ok(ok(customers))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(new) = payload?;
    if new.name.trim().is_empty() || new.email.trim().is_empty() {
        return Err(AppError::bad_request("name and email are required"));
    }
    let customer = customer_db::insert_customer(&state.pool, &new)
        .await
        .map_err(AppError::database)?;
    tracing::info!(customer_id = %customer.id, "customer created");
    Ok(created(customer))
}

async fn show(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let customer = customer_db::get_customer(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("customer {id} not found")))?;
    Ok(ok(customer))
}

async fn update(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CustomerUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Json(changes) = payload?;
    let customer = customer_db::update_customer(&state.pool, id, &changes)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(format!("customer {id} not found")))?;
    Ok(ok(customer))
}

async fn remove(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let deleted = customer_db::delete_customer(&state.pool, id)
        .await
        .map_err(AppError::database)?;
    if !deleted {
        return Err(AppError::not_found(format!("customer {id} not found")));
    }
    Ok(ok(serde_json::json!({ "id": id })))
}
