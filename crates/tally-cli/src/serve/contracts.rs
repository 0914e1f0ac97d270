use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use tally_db::queries::contracts::{self as contract_db, ContractUpdate, NewContract};

use super::{AppError, AppState, created, ok};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/contracts", get(list).post(create))
        .route("/api/contracts/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    customer_id: Option<Uuid>,
}

async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let contracts = contract_db::list_contracts(&state.pool, params.customer_id)
        .await
        .map_err(AppError::internal)?;
    Ok(ok(contracts))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewContract>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(new) = payload?;
    if let Some(end) = new.end_date {
        if end < new.start_date {
            return Err(AppError::bad_request("end_date is before start_date"));
        }
    }
    let contract = contract_db::insert_contract(&state.pool, &new)
        .await
        .map_err(AppError::database)?;
    tracing::info!(contract_id = %contract.id, customer_id = %contract.customer_id, "contract created");
    Ok(created(contract))
}

async fn show(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let contract = contract_db::get_contract(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("contract {id} not found")))?;
    Ok(ok(contract))
}

async fn update(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ContractUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Json(changes) = payload?;
    if let Some(end) = changes.end_date {
        let existing = contract_db::get_contract(&state.pool, id)
            .await
            .map_err(AppError::internal)?
            .ok_or_else(|| AppError::not_found(format!("contract {id} not found")))?;
        if end < existing.start_date {
            return Err(AppError::bad_request("end_date is before start_date"));
        }
    }
    let contract = contract_db::update_contract(&state.pool, id, &changes)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(format!("contract {id} not found")))?;
    Ok(ok(contract))
}

async fn remove(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    if !contract_db::delete_contract(&state.pool, id)
        .await
        .map_err(AppError::database)?
    {
        return Err(AppError::not_found(format!("contract {id} not found")));
    }
    Ok(ok(serde_json::json!({ "id": id })))
}
