use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use tally_db::queries::partners::{self as partner_db, NewPartner, PartnerUpdate};

use super::{AppError, AppState, created, ok};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/partners", get(list).post(create))
        .route("/api/partners/{id}", get(show).put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> Result<Response, AppError> {
    let partners = partner_db::list_partners(&state.pool)
        .await
        .map_err(AppError::internal)?;
    Ok(ok(partners))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewPartner>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(new) = payload?;
    let partner = partner_db::insert_partner(&state.pool, &new)
        .await
        .map_err(AppError::database)?;
    Ok(created(partner))
}

async fn show(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let partner = partner_db::get_partner(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("partner {id} not found")))?;
    Ok(ok(partner))
}

async fn update(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PartnerUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Json(changes) = payload?;
    let partner = partner_db::update_partner(&state.pool, id, &changes)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(format!("partner {id} not found")))?;
    Ok(ok(partner))
}

async fn remove(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    if !partner_db::delete_partner(&state.pool, id)
        .await
        .map_err(AppError::database)?
    {
        return Err(AppError::not_found(format!("partner {id} not found")));
    }
    Ok(ok(serde_json::json!({ "id": id })))
}
