//! Plan submission: turning a finished wizard draft into persisted rows.

pub mod service;

use serde::{Deserialize, Serialize};

use tally_db::models::{PlanAssignment, PlanKpi, PlanMilestone, ServicePlan};

use crate::draft::PlanDraft;

pub use service::{PlanError, create_plan, get_plan_detail};

/// The payload posted to plan creation: the draft plus its derived price.
///
/// `total_price` is informational; the server recomputes it from the
/// pricing selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSubmission {
    #[serde(flatten)]
    pub draft: PlanDraft,
    #[serde(default)]
    pub total_price: f64,
}

impl PlanSubmission {
    pub fn from_draft(draft: PlanDraft) -> Self {
        let total_price = draft.total_price();
        Self { draft, total_price }
    }
}

/// A stored plan with its child rows in entry order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: ServicePlan,
    pub milestones: Vec<PlanMilestone>,
    pub kpis: Vec<PlanKpi>,
    pub assignments: Vec<PlanAssignment>,
}
