//! Plan service layer.
//!
//! Creates a plan from a submitted draft, inserting the plan row and its
//! milestones, KPIs, and assignments within a single database transaction.

use anyhow::{Context, Result};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use tally_db::models::ServicePlan;
use tally_db::queries::customers as customer_queries;
use tally_db::queries::plans::{
    self as plan_queries, NewAssignment, NewKpi, NewMilestone, NewServicePlan,
};

use super::{PlanDetail, PlanSubmission};
use crate::wizard::{Stage, ValidationError, validate_all};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("customer {0} not found")]
    CustomerNotFound(Uuid),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Validate `submission` against every stage gate and persist it.
///
/// Draft item IDs only identify entries while editing; child rows always get
/// fresh IDs, so the same submission can be stored more than once. The
/// stored `total_price` is recomputed from the pricing selection; a
/// differing client-supplied value is logged and ignored.
pub async fn create_plan(pool: &PgPool, submission: &PlanSubmission) -> Result<ServicePlan, PlanError> {
    let draft = &submission.draft;
    validate_all(draft)?;

    let customer_id = draft.basic.client_id.ok_or(ValidationError::MissingField {
        stage: Stage::Basic,
        field: "client",
    })?;
    if customer_queries::get_customer(pool, customer_id).await?.is_none() {
        return Err(PlanError::CustomerNotFound(customer_id));
    }

    let total_price = draft.total_price();
    if (total_price - submission.total_price).abs() > f64::EPSILON {
        warn!(
            submitted = submission.total_price,
            computed = total_price,
            "submitted total price differs; using computed price"
        );
    }

    let package = draft.pricing.package.map(|p| p.to_string()).unwrap_or_default();
    let billing_cycle = draft
        .pricing
        .billing_cycle
        .map(|c| c.to_string())
        .unwrap_or_default();
    let add_ons: Vec<String> = draft.pricing.add_ons.iter().map(ToString::to_string).collect();
    let data_domains: Vec<String> = draft.erp.data_domains.iter().map(ToString::to_string).collect();
    let governance =
        serde_json::to_value(&draft.governance).context("failed to encode governance terms")?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = plan_queries::insert_plan(
        &mut *tx,
        &NewServicePlan {
            customer_id,
            name: draft.basic.plan_name.trim(),
            start_date: draft.basic.start_date,
            description: draft.basic.description.as_deref(),
            package: &package,
            billing_cycle: &billing_cycle,
            add_ons: &add_ons,
            total_price,
            erp_type: draft.erp.erp_type,
            data_domains: &data_domains,
            governance: &governance,
        },
    )
    .await?;

    for (position, m) in (0..).zip(&draft.milestones) {
        let new = NewMilestone {
            id: Uuid::new_v4(),
            sequence: to_i32(m.sequence, "milestone sequence")?,
            name: &m.name,
            duration_weeks: to_i32(m.duration_weeks, "milestone duration")?,
            budget_percent: m.budget_percent,
            critical_path: m.critical_path,
            owner: m.owner,
        };
        plan_queries::insert_milestone(&mut *tx, plan.id, position, &new).await?;
    }

    for (position, k) in (0..).zip(&draft.kpis) {
        let new = NewKpi {
            id: Uuid::new_v4(),
            kpi_code: k.kpi_code.trim(),
            target_value: k.target_value,
            green: k.thresholds.green,
            amber: k.thresholds.amber,
            red: k.thresholds.red,
            weight: k.weight,
        };
        plan_queries::insert_kpi(&mut *tx, plan.id, position, &new).await?;
    }

    for (position, a) in (0..).zip(&draft.assignments) {
        let new = NewAssignment {
            id: Uuid::new_v4(),
            assignment_type: a.assignment_type,
            partner_id: a.partner_id,
            sla_hours: to_i32(a.sla_hours, "assignment SLA hours")?,
            due_date: a.due_date,
            priority: a.priority,
        };
        plan_queries::insert_assignment(&mut *tx, plan.id, position, &new).await?;
    }

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        plan_id = %plan.id,
        customer_id = %customer_id,
        milestones = draft.milestones.len(),
        kpis = draft.kpis.len(),
        assignments = draft.assignments.len(),
        total_price,
        "plan created"
    );
    Ok(plan)
}

/// Fetch a plan and all its child rows.
pub async fn get_plan_detail(pool: &PgPool, plan_id: Uuid) -> Result<Option<PlanDetail>> {
    let Some(plan) = plan_queries::get_plan(pool, plan_id).await? else {
        return Ok(None);
    };
    let milestones = plan_queries::list_milestones(pool, plan_id).await?;
    let kpis = plan_queries::list_kpis(pool, plan_id).await?;
    let assignments = plan_queries::list_assignments(pool, plan_id).await?;
    Ok(Some(PlanDetail {
        plan,
        milestones,
        kpis,
        assignments,
    }))
}

fn to_i32(value: u32, what: &str) -> Result<i32> {
    i32::try_from(value).with_context(|| format!("{what} {value} is out of range"))
}
