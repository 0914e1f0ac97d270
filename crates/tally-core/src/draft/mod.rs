//! Plan draft: the client-owned working state of the plan-builder wizard,
//! and its durable storage.

pub mod store;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tally_db::models::{AssignmentType, DataDomain, ErpType, MilestoneOwner, Priority};

use crate::pricing::PricingSelection;

pub use store::{DRAFT_KEY, DraftError, DraftStore, FileDraftStore, MemoryDraftStore, StoredDraft};

/// Everything entered in the wizard so far.
///
/// Serialized in camelCase so the blob matches what the browser client
/// writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanDraft {
    pub basic: BasicInfo,
    pub erp: ErpSelection,
    pub milestones: Vec<MilestoneItem>,
    pub kpis: Vec<KpiItem>,
    pub assignments: Vec<AssignmentItem>,
    pub governance: GovernanceTerms,
    pub pricing: PricingSelection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicInfo {
    pub plan_name: String,
    pub client_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErpSelection {
    pub erp_type: ErpType,
    pub data_domains: Vec<DataDomain>,
}

/// A budgeted phase of the plan. `sequence` is expected to be unique per
/// plan but is not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub sequence: u32,
    #[serde(default)]
    pub name: String,
    pub duration_weeks: u32,
    pub budget_percent: f64,
    #[serde(default)]
    pub critical_path: bool,
    pub owner: MilestoneOwner,
}

/// Red/amber/green thresholds for a KPI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub green: f64,
    pub amber: f64,
    pub red: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub kpi_code: String,
    pub target_value: f64,
    #[serde(default)]
    pub thresholds: Thresholds,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub assignment_type: AssignmentType,
    #[serde(default)]
    pub partner_id: Option<Uuid>,
    pub sla_hours: u32,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

/// How often governance meetings or reports happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cadence {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GovernanceTerms {
    pub steering_cadence: Option<Cadence>,
    pub reporting_frequency: Option<Cadence>,
    pub escalation_contact: String,
}

impl PlanDraft {
    /// Give every milestone, KPI, and assignment lacking an ID a fresh one.
    ///
    /// Order and all other fields are untouched. Returns how many IDs were
    /// generated.
    pub fn reconcile(&mut self) -> usize {
        let mut generated = 0;
        let slots = self
            .milestones
            .iter_mut()
            .map(|m| &mut m.id)
            .chain(self.kpis.iter_mut().map(|k| &mut k.id))
            .chain(self.assignments.iter_mut().map(|a| &mut a.id));
        for id in slots {
            if id.is_none() {
                *id = Some(Uuid::new_v4());
                generated += 1;
            }
        }
        generated
    }

    /// Derived monthly price of the current pricing selection.
    pub fn total_price(&self) -> f64 {
        self.pricing.total_price()
    }
}
