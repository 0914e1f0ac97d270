//! Financial KPIs computed from live ERP totals.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::aggregate::{DateRange, ErpCredentials, ErpGateway, Ledger};
use super::ErpError;

pub const EBITDA_MARGIN_CODE: &str = "FIN.EBITDA%";
pub const REVENUE_CODE: &str = "FIN.REVENUE";
pub const OPEX_CODE: &str = "FIN.OPEX";

const EBITDA_FORMULA: &str = "EBITDA Margin = (Revenue - Operating Expenses) / Revenue * 100";

/// EBITDA margin as a percentage of revenue. Zero revenue yields a margin of
/// zero rather than a division error.
pub fn ebitda_margin(revenue: f64, operating_expenses: f64) -> f64 {
    if revenue == 0.0 {
        return 0.0;
    }
    (revenue - operating_expenses) / revenue * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbitdaMarginReport {
    pub kpi_code: String,
    pub period: DateRange,
    pub revenue: f64,
    pub operating_expenses: f64,
    pub ebitda: f64,
    pub ebitda_margin: f64,
    pub formula: String,
    pub calculation: String,
    pub note: String,
}

impl EbitdaMarginReport {
    pub fn new(period: DateRange, revenue: f64, operating_expenses: f64) -> Self {
        let ebitda = revenue - operating_expenses;
        let margin = ebitda_margin(revenue, operating_expenses);
        let note = if revenue == 0.0 {
            "No posted revenue in the period; margin reported as 0.".to_owned()
        } else {
            "Operating expenses are posted vendor bills net of refunds; depreciation and \
             amortization are not separated."
                .to_owned()
        };
        Self {
            kpi_code: EBITDA_MARGIN_CODE.to_owned(),
            period,
            revenue,
            operating_expenses,
            ebitda,
            ebitda_margin: margin,
            formula: EBITDA_FORMULA.to_owned(),
            calculation: format!(
                "({revenue:.2} - {operating_expenses:.2}) / {revenue:.2} * 100 = {margin:.2}%"
            ),
            note,
        }
    }
}

/// A single ledger total reported as a KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiFigure {
    pub kpi_code: String,
    pub period: DateRange,
    pub value: f64,
}

pub async fn fetch_figure(
    gateway: &dyn ErpGateway,
    creds: &ErpCredentials,
    ledger: Ledger,
    range: &DateRange,
) -> Result<KpiFigure, ErpError> {
    let value = gateway.ledger_total(creds, ledger, range).await?;
    let kpi_code = match ledger {
        Ledger::Revenue => REVENUE_CODE,
        Ledger::Expenses => OPEX_CODE,
    };
    Ok(KpiFigure {
        kpi_code: kpi_code.to_owned(),
        period: *range,
        value,
    })
}

/// Fetch revenue and expenses concurrently and compute the EBITDA margin.
pub async fn fetch_ebitda_margin(
    gateway: &dyn ErpGateway,
    creds: &ErpCredentials,
    range: &DateRange,
) -> Result<EbitdaMarginReport, ErpError> {
    let (revenue, expenses) = tokio::try_join!(
        gateway.ledger_total(creds, Ledger::Revenue, range),
        gateway.ledger_total(creds, Ledger::Expenses, range),
    )?;
    let report = EbitdaMarginReport::new(*range, revenue, expenses);
    info!(
        base_url = %creds.base_url,
        %range,
        revenue,
        expenses,
        margin = report.ebitda_margin,
        "EBITDA margin computed"
    );
    Ok(report)
}
