//! CLI handler for `tally erp kpi`.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use tally_core::connection;
use tally_core::erp::{DateRange, EbitdaMarginReport, ErpGateway, OdooClient, fetch_ebitda_margin};

use crate::ErpCommands;
use crate::config::TallyConfig;

pub async fn run_erp_command(command: ErpCommands, pool: &PgPool, cfg: &TallyConfig) -> Result<()> {
    match command {
        ErpCommands::Kpi {
            connection_id,
            start,
            end,
        } => {
            let id = Uuid::parse_str(&connection_id)
                .with_context(|| format!("invalid connection ID: {connection_id}"))?;
            let range = parse_range(&start, &end)?;
            let client = OdooClient::new(cfg.erp_timeout)?;
            let report = cmd_kpi(pool, &client, id, &range).await?;
            print!("{}", render_report(&report));
            Ok(())
        }
    }
}

async fn cmd_kpi(
    pool: &PgPool,
    gateway: &dyn ErpGateway,
    id: Uuid,
    range: &DateRange,
) -> Result<EbitdaMarginReport> {
    let (_, creds) = connection::active_credentials(pool, id).await?;
    Ok(fetch_ebitda_margin(gateway, &creds, range).await?)
}

fn parse_range(start: &str, end: &str) -> Result<DateRange> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start date: {start}"))?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .with_context(|| format!("invalid --end date: {end}"))?;
    if start > end {
        bail!("--start {start} is after --end {end}");
    }
    Ok(DateRange::new(start, end))
}

fn render_report(report: &EbitdaMarginReport) -> String {
    format!(
        "{code}  {period}\n  revenue:            {rev:>14.2}\n  operating expenses: {opex:>14.2}\n  EBITDA:             {ebitda:>14.2}\n  margin:             {margin:>13.2}%\n  {calc}\n  {note}\n",
        code = report.kpi_code,
        period = report.period,
        rev = report.revenue,
        opex = report.operating_expenses,
        ebitda = report.ebitda,
        margin = report.ebitda_margin,
        calc = report.calculation,
        note = report.note,
    )
}
