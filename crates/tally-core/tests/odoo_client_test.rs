//! Odoo client behavior against a wiremock double: session handling,
//! endpoint fallback, and ledger signs.

use chrono::NaiveDate;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tally_core::erp::{
    DEFAULT_TIMEOUT, DateRange, ErpCredentials, ErpError, ErpGateway, Ledger, OdooClient,
    fetch_ebitda_margin,
};

fn creds(server: &MockServer) -> ErpCredentials {
    ErpCredentials {
        base_url: server.uri(),
        database: "acme".into(),
        username: "api@acme.test".into(),
        password: "s3cret".into(),
    }
}

fn q1() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    )
}

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

fn rpc_error(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": 200, "message": "Odoo Server Error", "data": { "message": text } }
    }))
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/web/session/authenticate"))
        .and(body_partial_json(json!({ "params": { "db": "acme", "login": "api@acme.test" } })))
        .respond_with(
            rpc_result(json!({ "uid": 7, "db": "acme" }))
                .insert_header("set-cookie", "session_id=sess-42; Expires=Fri, 01 Jan 2027 00:00:00 GMT; HttpOnly; Path=/"),
        )
        .mount(server)
        .await;
}

fn client() -> OdooClient {
    OdooClient::new(DEFAULT_TIMEOUT).unwrap()
}

#[tokio::test]
async fn authenticate_extracts_session_cookie() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let session = client().authenticate(&creds(&server)).await.unwrap();
    assert_eq!(session.uid, 7);
    assert_eq!(session.session_id, "sess-42");
}

#[tokio::test]
async fn missing_cookie_is_session_extraction_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/session/authenticate"))
        .respond_with(rpc_result(json!({ "uid": 7 })))
        .mount(&server)
        .await;

    let err = client().authenticate(&creds(&server)).await.unwrap_err();
    assert!(matches!(err, ErpError::SessionExtraction), "got {err:?}");
}

#[tokio::test]
async fn rpc_error_on_login_is_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/session/authenticate"))
        .respond_with(rpc_error("Access Denied"))
        .mount(&server)
        .await;

    let err = client().authenticate(&creds(&server)).await.unwrap_err();
    match err {
        ErpError::Authentication(message) => assert_eq!(message, "Access Denied"),
        other => panic!("expected Authentication, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_login_without_uid_is_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/session/authenticate"))
        .respond_with(rpc_result(json!({ "uid": false })).insert_header("set-cookie", "session_id=x"))
        .mount(&server)
        .await;

    let err = client().authenticate(&creds(&server)).await.unwrap_err();
    assert!(matches!(err, ErpError::Authentication(_)));
}

#[tokio::test]
async fn revenue_is_invoices_less_refunds() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/web/dataset/search_read"))
        .and(header("cookie", "session_id=sess-42"))
        .and(body_partial_json(json!({ "params": { "model": "account.move" } })))
        .respond_with(rpc_result(json!([
            { "id": 1, "move_type": "out_invoice", "amount_total": 100.0, "state": "posted" },
            { "id": 2, "move_type": "out_refund", "amount_total": 30.0, "state": "posted" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let total = client()
        .ledger_total(&creds(&server), Ledger::Revenue, &q1())
        .await
        .unwrap();
    assert_eq!(total, 70.0);
}

#[tokio::test]
async fn search_read_error_falls_back_to_call_kw() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/web/dataset/search_read"))
        .respond_with(rpc_error("search_read is not available"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/web/dataset/call_kw"))
        .and(body_partial_json(json!({
            "params": {
                "model": "account.move",
                "method": "search_read",
                "kwargs": { "fields": ["amount_total", "move_type", "date", "state"] }
            }
        })))
        .respond_with(rpc_result(json!({
            "length": 2,
            "records": [
                { "move_type": "in_invoice", "amount_total": 500.0 },
                { "move_type": "in_refund", "amount_total": 120.5 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let total = client()
        .ledger_total(&creds(&server), Ledger::Expenses, &q1())
        .await
        .unwrap();
    assert_eq!(total, 379.5);
}

#[tokio::test]
async fn both_endpoints_failing_reports_last_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/web/dataset/search_read"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/web/dataset/call_kw"))
        .respond_with(rpc_error("Invalid field account.move.move_type"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client()
        .ledger_total(&creds(&server), Ledger::Revenue, &q1())
        .await
        .unwrap_err();
    assert!(matches!(err, ErpError::AggregateEndpointFailure { .. }));
    let message = err.to_string();
    assert!(
        message.contains("Invalid field account.move.move_type"),
        "message should carry the call_kw error: {message}"
    );
}

#[tokio::test]
async fn ebitda_margin_from_both_ledgers() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/web/dataset/search_read"))
        .and(body_string_contains("out_invoice"))
        .respond_with(rpc_result(json!([
            { "move_type": "out_invoice", "amount_total": 1000.0 },
            { "move_type": "out_refund", "amount_total": 200.0 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/web/dataset/search_read"))
        .and(body_string_contains("in_invoice"))
        .respond_with(rpc_result(json!([{ "move_type": "in_invoice", "amount_total": 600.0 }])))
        .mount(&server)
        .await;

    let report = fetch_ebitda_margin(&client(), &creds(&server), &q1())
        .await
        .unwrap();
    assert_eq!(report.revenue, 800.0);
    assert_eq!(report.operating_expenses, 600.0);
    assert_eq!(report.ebitda, 200.0);
    assert_eq!(report.ebitda_margin, 25.0);
}

#[tokio::test]
async fn ebitda_margin_with_no_revenue_is_zero() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/web/dataset/search_read"))
        .and(body_string_contains("out_invoice"))
        .respond_with(rpc_result(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/web/dataset/search_read"))
        .and(body_string_contains("in_invoice"))
        .respond_with(rpc_result(json!([{ "move_type": "in_invoice", "amount_total": 90.0 }])))
        .mount(&server)
        .await;

    let report = fetch_ebitda_margin(&client(), &creds(&server), &q1())
        .await
        .unwrap();
    assert_eq!(report.revenue, 0.0);
    assert_eq!(report.ebitda_margin, 0.0);
}
