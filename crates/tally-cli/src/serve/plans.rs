use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tally_core::notify::{self, Notice};
use tally_core::plan::{self as plan_service, PlanSubmission};
use tally_db::models::{PlanStatus, ServicePlan};
use tally_db::queries::plans as plan_db;

use super::{AppError, AppState, created, ok};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/plans", get(list).post(create))
        .route("/api/plans/{id}", get(show).delete(remove))
        .route("/api/plans/{id}/status", put(set_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: PlanStatus,
}

#[derive(Debug, Serialize)]
struct PlanCreated {
    #[serde(flatten)]
    plan: ServicePlan,
    notified: bool,
}

async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let plans = plan_db::list_plans(&state.pool, params.customer_id)
        .await
        .map_err(AppError::internal)?;
    Ok(ok(plans))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<PlanSubmission>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(submission) = payload?;
    let plan = plan_service::create_plan(&state.pool, &submission).await?;
    let notified = notify::deliver(state.notifier.as_ref(), &Notice::plan_created(&plan)).await;
    Ok(created(PlanCreated { plan, notified }))
}

async fn show(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let detail = plan_service::get_plan_detail(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("plan {id} not found")))?;
    Ok(ok(detail))
}

async fn set_status(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Json(change) = payload?;
    let plan = plan_db::update_plan_status(&state.pool, id, change.status)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("plan {id} not found")))?;
    tracing::info!(plan_id = %id, status = %plan.status, "plan status changed");
    Ok(ok(plan))
}

async fn remove(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    if !plan_db::delete_plan(&state.pool, id)
        .await
        .map_err(AppError::internal)?
    {
        return Err(AppError::not_found(format!("plan {id} not found")));
    }
    Ok(ok(serde_json::json!({ "id": id })))
}
