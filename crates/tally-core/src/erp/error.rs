use thiserror::Error;

use tally_db::models::ErpType;

#[derive(Debug, Error)]
pub enum ErpError {
    #[error("Odoo authentication failed: {0}")]
    Authentication(String),

    #[error("Odoo did not return a session_id cookie")]
    SessionExtraction,

    #[error("Odoo aggregate query failed on both endpoints; last error: {last_error}")]
    AggregateEndpointFailure { last_error: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{url} returned a JSON-RPC error: {message}")]
    Rpc { url: String, message: String },

    #[error("unexpected response from {url}: {detail}")]
    InvalidResponse { url: String, detail: String },

    #[error("ERP type {0} is not supported for live queries")]
    UnsupportedErpType(ErpType),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
