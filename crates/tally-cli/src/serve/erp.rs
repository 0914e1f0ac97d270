use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use tally_core::connection::{self, ConnectionError};
use tally_core::erp::{self as erp_kpi, DateRange, Ledger};
use tally_core::notify::{self, Notice};
use tally_db::queries::erp_connections::{self as conn_db, NewErpConnection};

use super::{AppError, AppState, created, ok};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/erp/connections", get(list).post(create))
        .route("/api/erp/connections/{id}", get(show))
        .route("/api/erp/connections/{id}/reconnect", post(reconnect))
        .route("/api/erp/connections/{id}/sync", post(sync))
        .route("/api/erp/connections/{id}/disconnect", post(disconnect))
        .route("/api/erp/kpi/ebitda-margin", get(ebitda_margin))
        .route("/api/erp/kpi/revenue", get(revenue))
        .route("/api/erp/kpi/expenses", get(expenses))
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    customer_id: Option<Uuid>,
}

/// Raw KPI query parameters, checked by [`KpiParams::resolve`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KpiParams {
    connection_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

fn parse_date(name: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("{name} must be a YYYY-MM-DD date, got {value:?}")))
}

fn date_range(start: &str, end: &str) -> Result<DateRange, AppError> {
    let range = DateRange::new(parse_date("startDate", start)?, parse_date("endDate", end)?);
    if range.start > range.end {
        return Err(AppError::bad_request("startDate is after endDate"));
    }
    Ok(range)
}

impl KpiParams {
    fn resolve(self) -> Result<(Uuid, DateRange), AppError> {
        let (Some(id), Some(start), Some(end)) = (self.connection_id, self.start_date, self.end_date)
        else {
            return Err(AppError::bad_request(
                "Missing required parameters: connectionId, startDate, endDate",
            ));
        };
        let id = Uuid::parse_str(&id)
            .map_err(|_| AppError::bad_request(format!("connectionId is not a UUID: {id:?}")))?;
        Ok((id, date_range(&start, &end)?))
    }
}

impl RangeParams {
    /// Explicit dates, or month-to-date when both are omitted.
    fn resolve(self) -> Result<DateRange, AppError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => date_range(&start, &end),
            (None, None) => {
                let today = Utc::now().date_naive();
                let first = today.with_day(1).unwrap_or(today);
                Ok(DateRange::new(first, today))
            }
            _ => Err(AppError::bad_request(
                "provide both startDate and endDate, or neither",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection records
// ---------------------------------------------------------------------------

async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let conns = conn_db::list_connections(&state.pool, params.customer_id)
        .await
        .map_err(AppError::internal)?;
    Ok(ok(conns))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewErpConnection>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(new) = payload?;
    if new.base_url.trim().is_empty() {
        return Err(AppError::bad_request("base_url is required"));
    }
    let conn = conn_db::insert_connection(&state.pool, &new)
        .await
        .map_err(AppError::database)?;
    tracing::info!(connection_id = %conn.id, erp_type = %conn.erp_type, "ERP connection registered");
    Ok(created(conn))
}

async fn show(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let conn = conn_db::get_connection(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("ERP connection {id} not found")))?;
    Ok(ok(conn))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

async fn reconnect(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    match connection::reconnect(&state.pool, state.erp.as_ref(), id).await {
        Ok(conn) => Ok(ok(conn)),
        Err(ConnectionError::Erp(e)) => {
            let notice = Notice::ErpConnectionFailed {
                connection_id: id,
                error: e.to_string(),
            };
            notify::deliver(state.notifier.as_ref(), &notice).await;
            Err(ConnectionError::Erp(e).into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn sync(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Query(params) = params?;
    let range = params.resolve()?;
    let conn = connection::sync(&state.pool, state.erp.as_ref(), id, &range).await?;
    Ok(ok(conn))
}

async fn disconnect(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let conn = connection::disconnect(&state.pool, id).await?;
    Ok(ok(conn))
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

async fn ebitda_margin(
    State(state): State<AppState>,
    params: Result<Query<KpiParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let (id, range) = params.resolve()?;
    let (_, creds) = connection::active_credentials(&state.pool, id).await?;
    let report = erp_kpi::fetch_ebitda_margin(state.erp.as_ref(), &creds, &range)
        .await
        .map_err(ConnectionError::from)?;
    Ok(ok(report))
}

async fn revenue(
    State(state): State<AppState>,
    params: Result<Query<KpiParams>, QueryRejection>,
) -> Result<Response, AppError> {
    ledger_figure(state, params, Ledger::Revenue).await
}

async fn expenses(
    State(state): State<AppState>,
    params: Result<Query<KpiParams>, QueryRejection>,
) -> Result<Response, AppError> {
    ledger_figure(state, params, Ledger::Expenses).await
}

async fn ledger_figure(
    state: AppState,
    params: Result<Query<KpiParams>, QueryRejection>,
    ledger: Ledger,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let (id, range) = params.resolve()?;
    let (_, creds) = connection::active_credentials(&state.pool, id).await?;
    let figure = erp_kpi::fetch_figure(state.erp.as_ref(), &creds, ledger, &range)
        .await
        .map_err(ConnectionError::from)?;
    Ok(ok(figure))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use tally_test_utils::{create_test_db, drop_test_db};

    use crate::serve::AppState;
    use crate::serve::tests::{send, state};

    async fn register(app: &AppState, base_url: &str, erp_type: &str) -> String {
        let (_, customer) = send(
            app.clone(),
            "POST",
            "/api/customers",
            Some(json!({ "name": "Ron Swanson", "email": format!("{}@pawnee.test", uuid::Uuid::new_v4().simple()) })),
        )
        .await;
        let (status, conn) = send(
            app.clone(),
            "POST",
            "/api/erp/connections",
            Some(json!({
                "customer_id": customer["data"]["id"],
                "erp_type": erp_type,
                "base_url": base_url,
                "database_name": "pawnee",
                "username": "api",
                "password": "lagavulin"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{conn}");
        assert!(conn["data"].get("password").is_none(), "password never serialized");
        conn["data"]["id"].as_str().unwrap().to_string()
    }

    fn rpc(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    async fn odoo_double() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web/session/authenticate"))
            .respond_with(rpc(json!({ "uid": 2 })).insert_header("set-cookie", "session_id=abc; Path=/"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/web/dataset/search_read"))
            .and(body_string_contains("out_invoice"))
            .respond_with(rpc(json!([
                { "move_type": "out_invoice", "amount_total": 100.0 },
                { "move_type": "out_refund", "amount_total": 30.0 }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/web/dataset/search_read"))
            .and(body_string_contains("in_invoice"))
            .respond_with(rpc(json!([{ "move_type": "in_invoice", "amount_total": 56.0 }])))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn ebitda_margin_route_reports_margin() {
        let (pool, db_name) = create_test_db().await;
        let app = state(pool.clone());
        let server = odoo_double().await;
        let id = register(&app, &server.uri(), "ODOO").await;

        let uri = format!("/api/erp/kpi/ebitda-margin?connectionId={id}&startDate=2026-01-01&endDate=2026-03-31");
        let (status, json) = send(app.clone(), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["data"]["kpiCode"], "FIN.EBITDA%");
        assert_eq!(json["data"]["revenue"], 70.0);
        assert_eq!(json["data"]["operatingExpenses"], 56.0);
        assert_eq!(json["data"]["ebitdaMargin"], 20.0);

        let uri = format!("/api/erp/kpi/revenue?connectionId={id}&startDate=2026-01-01&endDate=2026-03-31");
        let (status, json) = send(app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["kpiCode"], "FIN.REVENUE");
        assert_eq!(json["data"]["value"], 70.0);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn kpi_parameter_errors() {
        let (pool, db_name) = create_test_db().await;
        let app = state(pool.clone());

        let (status, json) = send(app.clone(), "GET", "/api/erp/kpi/ebitda-margin?startDate=2026-01-01", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing required parameters: connectionId, startDate, endDate");

        let missing = uuid::Uuid::new_v4();
        let uri = format!("/api/erp/kpi/ebitda-margin?connectionId={missing}&startDate=2026-01-01&endDate=2026-01-31");
        let (status, _) = send(app.clone(), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/erp/kpi/ebitda-margin?connectionId={missing}&startDate=2026-02-01&endDate=2026-01-31");
        let (status, _) = send(app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn disconnected_connection_is_bad_request() {
        let (pool, db_name) = create_test_db().await;
        let app = state(pool.clone());
        let id = register(&app, "http://127.0.0.1:9", "ODOO").await;

        let (status, json) = send(app.clone(), "POST", &format!("/api/erp/connections/{id}/disconnect"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "DISCONNECTED");

        let uri = format!("/api/erp/kpi/ebitda-margin?connectionId={id}&startDate=2026-01-01&endDate=2026-01-31");
        let (status, json) = send(app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("not active"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn erp_failure_is_500_with_raw_message() {
        let (pool, db_name) = create_test_db().await;
        let app = state(pool.clone());
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web/session/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": { "message": "Odoo Server Error", "data": { "message": "Wrong login/password" } }
            })))
            .mount(&server)
            .await;
        let id = register(&app, &server.uri(), "ODOO").await;

        let uri = format!("/api/erp/kpi/expenses?connectionId={id}&startDate=2026-01-01&endDate=2026-01-31");
        let (status, json) = send(app.clone(), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("Wrong login/password"));

        let (status, _) = send(app.clone(), "POST", &format!("/api/erp/connections/{id}/reconnect"), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (_, json) = send(app, "GET", &format!("/api/erp/connections/{id}"), None).await;
        assert_eq!(json["data"]["status"], "ERROR");
        assert!(json["data"]["last_error"].as_str().unwrap().contains("Wrong login/password"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn non_odoo_sync_is_rejected() {
        let (pool, db_name) = create_test_db().await;
        let app = state(pool.clone());
        let id = register(&app, "https://xero.test", "XERO").await;

        let (status, json) = send(app, "POST", &format!("/api/erp/connections/{id}/sync"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("XERO"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
