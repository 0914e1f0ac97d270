//! Odoo JSON-RPC client.
//!
//! Odoo exposes its ORM over `POST` JSON-RPC "call" envelopes. A session is
//! opened with `/web/session/authenticate` and carried in the `session_id`
//! cookie on later calls. Aggregate reads try `/web/dataset/search_read`
//! first and fall back to the generic `/web/dataset/call_kw` endpoint, since
//! newer Odoo releases dropped the former.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::aggregate::{AccountMove, DateRange, ErpCredentials, ErpGateway, Ledger};
use super::ErpError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MOVE_MODEL: &str = "account.move";
const MOVE_FIELDS: [&str; 4] = ["amount_total", "move_type", "date", "state"];

static SESSION_COOKIE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"session_id=([^;]+)").expect("session cookie pattern compiles"));

/// An authenticated Odoo session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdooSession {
    pub uid: i64,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    message: String,
}

impl RpcError {
    /// Odoo puts the useful text in `data.message`; `message` is often just
    /// "Odoo Server Error".
    fn text(&self) -> String {
        match &self.data {
            Some(data) if !data.message.is_empty() => data.message.clone(),
            _ => self.message.clone(),
        }
    }
}

/// Pull the session ID out of one or more `Set-Cookie` headers.
pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| SESSION_COOKIE.captures(v))
        .map(|c| c[1].to_owned())
}

/// Odoo domain selecting posted moves of `ledger` dated within `range`.
pub fn move_domain(ledger: Ledger, range: &DateRange) -> Value {
    json!([
        ["state", "=", "posted"],
        ["move_type", "in", ledger.move_types()],
        ["date", ">=", range.start.to_string()],
        ["date", "<=", range.end.to_string()],
    ])
}

pub struct OdooClient {
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl OdooClient {
    pub fn new(timeout: Duration) -> Result<Self, ErpError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ErpError::Client)?;
        Ok(Self::with_client(http))
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a session. Fails if Odoo reports an error, rejects the login, or
    /// sends no session cookie.
    pub async fn authenticate(&self, creds: &ErpCredentials) -> Result<OdooSession, ErpError> {
        let url = format!("{}/web/session/authenticate", creds.base_url);
        let params = json!({
            "db": creds.database,
            "login": creds.username,
            "password": creds.password,
        });

        let (result, headers) = match self.call(&url, params, None).await {
            Ok(ok) => ok,
            Err(ErpError::Rpc { message, .. }) => return Err(ErpError::Authentication(message)),
            Err(e) => return Err(e),
        };

        let uid = result
            .get("uid")
            .and_then(Value::as_i64)
            .ok_or_else(|| ErpError::Authentication("invalid login or password".to_owned()))?;
        let session_id = extract_session_id(&headers).ok_or(ErpError::SessionExtraction)?;

        debug!(base_url = %creds.base_url, uid, "Odoo session opened");
        Ok(OdooSession { uid, session_id })
    }

    /// Read posted moves matching `domain`, trying `search_read` and then
    /// `call_kw`.
    pub async fn search_moves(
        &self,
        base_url: &str,
        session: &OdooSession,
        domain: Value,
    ) -> Result<Vec<AccountMove>, ErpError> {
        let search_url = format!("{base_url}/web/dataset/search_read");
        let search_params = json!({
            "model": MOVE_MODEL,
            "domain": domain.clone(),
            "fields": MOVE_FIELDS,
        });
        let first = match self.call(&search_url, search_params, Some(session)).await {
            Ok((result, _)) => return parse_records(&search_url, result),
            Err(e) => e,
        };
        warn!(error = %first, "search_read failed, falling back to call_kw");

        let kw_url = format!("{base_url}/web/dataset/call_kw");
        let kw_params = json!({
            "model": MOVE_MODEL,
            "method": "search_read",
            "args": [domain],
            "kwargs": { "fields": MOVE_FIELDS },
        });
        match self.call(&kw_url, kw_params, Some(session)).await {
            Ok((result, _)) => parse_records(&kw_url, result),
            Err(last) => Err(ErpError::AggregateEndpointFailure {
                last_error: last.to_string(),
            }),
        }
    }

    async fn call(
        &self,
        url: &str,
        params: Value,
        session: Option<&OdooSession>,
    ) -> Result<(Value, HeaderMap), ErpError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });

        let mut request = self.http.post(url).json(&body);
        if let Some(session) = session {
            request = request.header(COOKIE, format!("session_id={}", session.session_id));
        }

        let transport = |source| ErpError::Transport {
            url: url.to_owned(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ErpError::HttpStatus {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        let headers = response.headers().clone();
        let rpc: RpcResponse = response.json().await.map_err(|e| ErpError::InvalidResponse {
            url: url.to_owned(),
            detail: e.to_string(),
        })?;

        if let Some(error) = rpc.error {
            return Err(ErpError::Rpc {
                url: url.to_owned(),
                message: error.text(),
            });
        }
        let result = rpc.result.ok_or_else(|| ErpError::InvalidResponse {
            url: url.to_owned(),
            detail: "neither result nor error present".to_owned(),
        })?;
        Ok((result, headers))
    }
}

/// Accept either a bare record list or `{records, length}`.
fn parse_records(url: &str, result: Value) -> Result<Vec<AccountMove>, ErpError> {
    let records = match result {
        Value::Array(list) => Value::Array(list),
        Value::Object(mut obj) => obj.remove("records").ok_or_else(|| ErpError::InvalidResponse {
            url: url.to_owned(),
            detail: "object result without records".to_owned(),
        })?,
        other => {
            return Err(ErpError::InvalidResponse {
                url: url.to_owned(),
                detail: format!("expected record list, got {other}"),
            });
        }
    };
    serde_json::from_value(records).map_err(|e| ErpError::InvalidResponse {
        url: url.to_owned(),
        detail: e.to_string(),
    })
}

#[async_trait]
impl ErpGateway for OdooClient {
    async fn verify(&self, creds: &ErpCredentials) -> Result<(), ErpError> {
        self.authenticate(creds).await.map(|_| ())
    }

    async fn ledger_total(
        &self,
        creds: &ErpCredentials,
        ledger: Ledger,
        range: &DateRange,
    ) -> Result<f64, ErpError> {
        let session = self.authenticate(creds).await?;
        let moves = self
            .search_moves(&creds.base_url, &session, move_domain(ledger, range))
            .await?;
        let total = ledger.signed_total(&moves);
        debug!(%ledger, %range, moves = moves.len(), total, "ledger aggregated");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn session_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("frontend_lang=en_US; Path=/"));
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("session_id=abc123def; Expires=Wed, 01 Jan 2031; HttpOnly; Path=/"),
        );
        assert_eq!(extract_session_id(&headers).as_deref(), Some("abc123def"));
    }

    #[test]
    fn missing_cookie_is_none() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("tz=UTC; Path=/"));
        assert_eq!(extract_session_id(&headers), None);
        assert_eq!(extract_session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn domain_is_inclusive_and_posted_only() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        );
        let domain = move_domain(Ledger::Expenses, &range);
        assert_eq!(domain[0], json!(["state", "=", "posted"]));
        assert_eq!(domain[1], json!(["move_type", "in", ["in_invoice", "in_refund"]]));
        assert_eq!(domain[2], json!(["date", ">=", "2026-01-01"]));
        assert_eq!(domain[3], json!(["date", "<=", "2026-03-31"]));
    }

    #[test]
    fn records_wrapper_accepted() {
        let wrapped = json!({ "length": 1, "records": [{ "move_type": "out_invoice", "amount_total": 5.5 }] });
        let bare = json!([{ "move_type": "out_invoice", "amount_total": 5.5 }]);
        assert_eq!(parse_records("u", wrapped).unwrap(), parse_records("u", bare).unwrap());
        assert!(parse_records("u", json!(false)).is_err());
    }

    #[test]
    fn rpc_error_prefers_data_message() {
        let err: RpcError = serde_json::from_value(json!({
            "message": "Odoo Server Error",
            "data": { "message": "Access Denied" }
        }))
        .unwrap();
        assert_eq!(err.text(), "Access Denied");
    }
}
