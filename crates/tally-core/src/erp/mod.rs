//! ERP integration: Odoo client, ledger aggregation, and KPI math.

pub mod aggregate;
pub mod client;
pub mod error;
pub mod kpi;

pub use aggregate::{AccountMove, DateRange, ErpCredentials, ErpGateway, Ledger};
pub use client::{DEFAULT_TIMEOUT, OdooClient, OdooSession};
pub use error::ErpError;
pub use kpi::{EbitdaMarginReport, KpiFigure, ebitda_margin, fetch_ebitda_margin, fetch_figure};
