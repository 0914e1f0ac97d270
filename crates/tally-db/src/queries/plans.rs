//! Database query functions for `service_plans` and its child tables
//! (`plan_milestones`, `plan_kpis`, `plan_assignments`).
//!
//! Insert helpers take a `PgConnection` so the plan service can run them
//! inside one transaction.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{
    AssignmentType, ErpType, MilestoneOwner, PlanAssignment, PlanKpi, PlanMilestone, PlanStatus,
    Priority, ServicePlan,
};

/// Column values for a new `service_plans` row.
#[derive(Debug, Clone)]
pub struct NewServicePlan<'a> {
    pub customer_id: Uuid,
    pub name: &'a str,
    pub start_date: Option<NaiveDate>,
    pub description: Option<&'a str>,
    pub package: &'a str,
    pub billing_cycle: &'a str,
    pub add_ons: &'a [String],
    pub total_price: f64,
    pub erp_type: ErpType,
    pub data_domains: &'a [String],
    pub governance: &'a serde_json::Value,
}

/// Column values for a new `plan_milestones` row.
#[derive(Debug, Clone)]
pub struct NewMilestone<'a> {
    pub id: Uuid,
    pub sequence: i32,
    pub name: &'a str,
    pub duration_weeks: i32,
    pub budget_percent: f64,
    pub critical_path: bool,
    pub owner: MilestoneOwner,
}

/// Column values for a new `plan_kpis` row.
#[derive(Debug, Clone)]
pub struct NewKpi<'a> {
    pub id: Uuid,
    pub kpi_code: &'a str,
    pub target_value: f64,
    pub green: f64,
    pub amber: f64,
    pub red: f64,
    pub weight: f64,
}

/// Column values for a new `plan_assignments` row.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub id: Uuid,
    pub assignment_type: AssignmentType,
    pub partner_id: Option<Uuid>,
    pub sla_hours: i32,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

/// Insert the plan row. Status starts as `draft`.
pub async fn insert_plan(conn: &mut PgConnection, new: &NewServicePlan<'_>) -> Result<ServicePlan> {
    let plan = sqlx::query_as::<_, ServicePlan>(
        "INSERT INTO service_plans \
             (customer_id, name, start_date, description, package, billing_cycle, add_ons, \
              total_price, erp_type, data_domains, governance) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING *",
    )
    .bind(new.customer_id)
    .bind(new.name)
    .bind(new.start_date)
    .bind(new.description)
    .bind(new.package)
    .bind(new.billing_cycle)
    .bind(new.add_ons)
    .bind(new.total_price)
    .bind(new.erp_type)
    .bind(new.data_domains)
    .bind(new.governance)
    .fetch_one(conn)
    .await
    .context("failed to insert service plan")?;

    Ok(plan)
}

/// Insert one milestone at `position` within the plan.
pub async fn insert_milestone(
    conn: &mut PgConnection,
    plan_id: Uuid,
    position: i32,
    new: &NewMilestone<'_>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO plan_milestones \
             (id, plan_id, position, sequence, name, duration_weeks, budget_percent, critical_path, owner) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(new.id)
    .bind(plan_id)
    .bind(position)
    .bind(new.sequence)
    .bind(new.name)
    .bind(new.duration_weeks)
    .bind(new.budget_percent)
    .bind(new.critical_path)
    .bind(new.owner)
    .execute(conn)
    .await
    .with_context(|| format!("failed to insert milestone {:?}", new.name))?;

    Ok(())
}

/// Insert one KPI at `position` within the plan.
pub async fn insert_kpi(
    conn: &mut PgConnection,
    plan_id: Uuid,
    position: i32,
    new: &NewKpi<'_>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO plan_kpis \
             (id, plan_id, position, kpi_code, target_value, green, amber, red, weight) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(new.id)
    .bind(plan_id)
    .bind(position)
    .bind(new.kpi_code)
    .bind(new.target_value)
    .bind(new.green)
    .bind(new.amber)
    .bind(new.red)
    .bind(new.weight)
    .execute(conn)
    .await
    .with_context(|| format!("failed to insert KPI {:?}", new.kpi_code))?;

    Ok(())
}

/// Insert one assignment at `position` within the plan.
pub async fn insert_assignment(
    conn: &mut PgConnection,
    plan_id: Uuid,
    position: i32,
    new: &NewAssignment,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO plan_assignments \
             (id, plan_id, position, assignment_type, partner_id, sla_hours, due_date, priority) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(new.id)
    .bind(plan_id)
    .bind(position)
    .bind(new.assignment_type)
    .bind(new.partner_id)
    .bind(new.sla_hours)
    .bind(new.due_date)
    .bind(new.priority)
    .execute(conn)
    .await
    .context("failed to insert assignment")?;

    Ok(())
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<ServicePlan>> {
    let plan = sqlx::query_as::<_, ServicePlan>("SELECT * FROM service_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// List plans, newest first, optionally restricted to one customer.
pub async fn list_plans(pool: &PgPool, customer_id: Option<Uuid>) -> Result<Vec<ServicePlan>> {
    let plans = sqlx::query_as::<_, ServicePlan>(
        "SELECT * FROM service_plans \
         WHERE ($1::uuid IS NULL OR customer_id = $1) \
         ORDER BY created_at DESC",
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
    .context("failed to list plans")?;

    Ok(plans)
}

/// Update the status of a plan. Returns `None` when the plan does not exist.
pub async fn update_plan_status(
    pool: &PgPool,
    id: Uuid,
    status: PlanStatus,
) -> Result<Option<ServicePlan>> {
    let plan = sqlx::query_as::<_, ServicePlan>(
        "UPDATE service_plans SET status = $2, updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await
    .context("failed to update plan status")?;

    Ok(plan)
}

/// Delete a plan and its child rows. Returns `false` when no row matched.
pub async fn delete_plan(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM service_plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete plan")?;

    Ok(result.rows_affected() > 0)
}

/// Milestones of a plan in their submitted order.
pub async fn list_milestones(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlanMilestone>> {
    let rows = sqlx::query_as::<_, PlanMilestone>(
        "SELECT * FROM plan_milestones WHERE plan_id = $1 ORDER BY position",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list milestones")?;

    Ok(rows)
}

/// KPIs of a plan in their submitted order.
pub async fn list_kpis(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlanKpi>> {
    let rows =
        sqlx::query_as::<_, PlanKpi>("SELECT * FROM plan_kpis WHERE plan_id = $1 ORDER BY position")
            .bind(plan_id)
            .fetch_all(pool)
            .await
            .context("failed to list KPIs")?;

    Ok(rows)
}

/// Assignments of a plan in their submitted order.
pub async fn list_assignments(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlanAssignment>> {
    let rows = sqlx::query_as::<_, PlanAssignment>(
        "SELECT * FROM plan_assignments WHERE plan_id = $1 ORDER BY position",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list assignments")?;

    Ok(rows)
}
