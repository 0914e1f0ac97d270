//! Signed invoice aggregation over an ERP ledger.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tally_db::models::ErpConnection;

use super::ErpError;

/// Which side of the books a total covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ledger {
    /// Customer invoices less customer credit notes.
    Revenue,
    /// Vendor bills less vendor refunds.
    Expenses,
}

impl Ledger {
    /// Odoo `move_type` values that contribute to this ledger.
    pub fn move_types(self) -> &'static [&'static str] {
        match self {
            Self::Revenue => &["out_invoice", "out_refund"],
            Self::Expenses => &["in_invoice", "in_refund"],
        }
    }

    /// Sign applied to `amount_total` for a given move type. Move types from
    /// the other ledger, or unknown ones, count as zero.
    pub fn sign(self, move_type: &str) -> f64 {
        match (self, move_type) {
            (Self::Revenue, "out_invoice") | (Self::Expenses, "in_invoice") => 1.0,
            (Self::Revenue, "out_refund") | (Self::Expenses, "in_refund") => -1.0,
            _ => 0.0,
        }
    }

    pub fn signed_total(self, moves: &[AccountMove]) -> f64 {
        moves
            .iter()
            .map(|m| self.sign(&m.move_type) * m.amount_total)
            .sum()
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Revenue => "revenue",
            Self::Expenses => "expenses",
        })
    }
}

/// The fields of an Odoo `account.move` record that aggregation reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMove {
    pub move_type: String,
    #[serde(default)]
    pub amount_total: f64,
}

/// Login details for one ERP instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ErpCredentials {
    pub base_url: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ErpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErpCredentials")
            .field("base_url", &self.base_url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<&ErpConnection> for ErpCredentials {
    fn from(conn: &ErpConnection) -> Self {
        Self {
            base_url: conn.base_url.trim_end_matches('/').to_owned(),
            database: conn.database_name.clone(),
            username: conn.username.clone(),
            password: conn.password.clone(),
        }
    }
}

/// Inclusive accounting-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Read access to an ERP's books.
#[async_trait]
pub trait ErpGateway: Send + Sync {
    /// Check that the credentials authenticate.
    async fn verify(&self, creds: &ErpCredentials) -> Result<(), ErpError>;

    /// Signed total of posted moves in `ledger` whose date falls in `range`.
    async fn ledger_total(
        &self,
        creds: &ErpCredentials,
        ledger: Ledger,
        range: &DateRange,
    ) -> Result<f64, ErpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(move_type: &str, amount_total: f64) -> AccountMove {
        AccountMove {
            move_type: move_type.into(),
            amount_total,
        }
    }

    #[test]
    fn invoice_less_refund() {
        let moves = [mv("out_invoice", 100.0), mv("out_refund", 30.0)];
        assert_eq!(Ledger::Revenue.signed_total(&moves), 70.0);
    }

    #[test]
    fn foreign_and_unknown_moves_count_zero() {
        let moves = [
            mv("in_invoice", 400.0),
            mv("in_refund", 50.0),
            mv("out_invoice", 999.0),
            mv("entry", 12.0),
        ];
        assert_eq!(Ledger::Expenses.signed_total(&moves), 350.0);
        assert_eq!(Ledger::Revenue.signed_total(&moves), 999.0);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = ErpCredentials {
            base_url: "https://odoo.test".into(),
            database: "acme".into(),
            username: "cfo".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("acme"));
    }
}
