//! Stage gates: the checks that must pass before the wizard leaves a stage.
//!
//! Each gate reports the first rule it finds violated. Gates run only at
//! stage transitions and on submission; a draft may be inconsistent while it
//! is being edited.

use thiserror::Error;

use crate::draft::PlanDraft;

use super::Stage;

/// Allowed distance from 100 for KPI weights and milestone budgets.
pub const SUM_TOLERANCE: f64 = 0.01;

/// A violated stage rule. The message is shown to the operator verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{stage}: {field} is required")]
    MissingField { stage: Stage, field: &'static str },

    #[error("erp: select at least one data domain for the connected ERP")]
    NoDataDomains,

    #[error("kpis: add at least one KPI")]
    NoKpis,

    #[error("kpis: KPI #{position} has no code")]
    BlankKpiCode { position: usize },

    #[error("kpis: weights must sum to 100 (currently {total:.2})")]
    KpiWeightSum { total: f64 },

    #[error("milestones: add at least one milestone")]
    NoMilestones,

    #[error("milestones: budget percentages must sum to 100 (currently {total:.2})")]
    MilestoneBudgetSum { total: f64 },
}

impl ValidationError {
    /// The stage whose gate produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::MissingField { stage, .. } => *stage,
            Self::NoDataDomains => Stage::Erp,
            Self::NoKpis | Self::BlankKpiCode { .. } | Self::KpiWeightSum { .. } => Stage::Kpis,
            Self::NoMilestones | Self::MilestoneBudgetSum { .. } => Stage::Milestones,
        }
    }
}

/// A passed gate, with any non-blocking warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub warnings: Vec<String>,
}

/// `true` when `total` is within [`SUM_TOLERANCE`] of 100.
pub fn sums_to_hundred(total: f64) -> bool {
    (total - 100.0).abs() <= SUM_TOLERANCE
}

/// Run the gate for `stage` against `draft`.
///
/// `Review` runs every other gate in stage order and merges their warnings.
pub fn validate_stage(stage: Stage, draft: &PlanDraft) -> Result<StageReport, ValidationError> {
    match stage {
        Stage::Basic => validate_basic(draft),
        Stage::Erp => validate_erp(draft),
        Stage::Kpis => validate_kpis(draft),
        Stage::Milestones => validate_milestones(draft),
        Stage::Assignments => Ok(validate_assignments(draft)),
        Stage::Governance => validate_governance(draft),
        Stage::Pricing => validate_pricing(draft),
        Stage::Review => validate_all(draft),
    }
}

/// Run every gate except `Review` itself, stopping at the first failure.
pub fn validate_all(draft: &PlanDraft) -> Result<StageReport, ValidationError> {
    let mut report = StageReport::default();
    for stage in Stage::ALL.into_iter().filter(|s| *s != Stage::Review) {
        let stage_report = validate_stage(stage, draft)?;
        report.warnings.extend(stage_report.warnings);
    }
    Ok(report)
}

fn missing(stage: Stage, field: &'static str) -> ValidationError {
    ValidationError::MissingField { stage, field }
}

fn validate_basic(draft: &PlanDraft) -> Result<StageReport, ValidationError> {
    let basic = &draft.basic;
    if basic.plan_name.trim().is_empty() {
        return Err(missing(Stage::Basic, "plan name"));
    }
    if basic.client_id.is_none() {
        return Err(missing(Stage::Basic, "client"));
    }
    if basic.start_date.is_none() {
        return Err(missing(Stage::Basic, "start date"));
    }
    Ok(StageReport::default())
}

fn validate_erp(draft: &PlanDraft) -> Result<StageReport, ValidationError> {
    if !draft.erp.erp_type.is_none() && draft.erp.data_domains.is_empty() {
        return Err(ValidationError::NoDataDomains);
    }
    Ok(StageReport::default())
}

fn validate_kpis(draft: &PlanDraft) -> Result<StageReport, ValidationError> {
    if draft.kpis.is_empty() {
        return Err(ValidationError::NoKpis);
    }
    if let Some(pos) = draft.kpis.iter().position(|k| k.kpi_code.trim().is_empty()) {
        return Err(ValidationError::BlankKpiCode { position: pos + 1 });
    }
    let total: f64 = draft.kpis.iter().map(|k| k.weight).sum();
    if !sums_to_hundred(total) {
        return Err(ValidationError::KpiWeightSum { total });
    }
    Ok(StageReport::default())
}

fn validate_milestones(draft: &PlanDraft) -> Result<StageReport, ValidationError> {
    if draft.milestones.is_empty() {
        return Err(ValidationError::NoMilestones);
    }
    let total: f64 = draft.milestones.iter().map(|m| m.budget_percent).sum();
    if !sums_to_hundred(total) {
        return Err(ValidationError::MilestoneBudgetSum { total });
    }
    Ok(StageReport::default())
}

fn validate_assignments(draft: &PlanDraft) -> StageReport {
    let mut report = StageReport::default();
    if draft.assignments.is_empty() {
        report
            .warnings
            .push("assignments: no assignments yet; work will not be routed to anyone".to_owned());
    }
    report
}

fn validate_governance(draft: &PlanDraft) -> Result<StageReport, ValidationError> {
    let gov = &draft.governance;
    if gov.steering_cadence.is_none() {
        return Err(missing(Stage::Governance, "steering cadence"));
    }
    if gov.reporting_frequency.is_none() {
        return Err(missing(Stage::Governance, "reporting frequency"));
    }
    if gov.escalation_contact.trim().is_empty() {
        return Err(missing(Stage::Governance, "escalation contact"));
    }
    Ok(StageReport::default())
}

fn validate_pricing(draft: &PlanDraft) -> Result<StageReport, ValidationError> {
    if draft.pricing.package.is_none() {
        return Err(missing(Stage::Pricing, "package"));
    }
    if draft.pricing.billing_cycle.is_none() {
        return Err(missing(Stage::Pricing, "billing cycle"));
    }
    Ok(StageReport::default())
}
