use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a service plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanStatus {
    type Err = PlanStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(PlanStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanStatus`] string.
#[derive(Debug, Clone)]
pub struct PlanStatusParseError(pub String);

impl fmt::Display for PlanStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid plan status: {:?}", self.0)
    }
}

impl std::error::Error for PlanStatusParseError {}

// ---------------------------------------------------------------------------

/// Status of a customer contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Active,
    Expired,
    Terminated,
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

impl FromStr for ContractStatus {
    type Err = ContractStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "terminated" => Ok(Self::Terminated),
            other => Err(ContractStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ContractStatus`] string.
#[derive(Debug, Clone)]
pub struct ContractStatusParseError(pub String);

impl fmt::Display for ContractStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid contract status: {:?}", self.0)
    }
}

impl std::error::Error for ContractStatusParseError {}

// ---------------------------------------------------------------------------

/// Kind of ERP system a customer runs. `None` means no ERP integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErpType {
    None,
    Odoo,
    Quickbooks,
    Xero,
    Netsuite,
}

impl fmt::Display for ErpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "NONE",
            Self::Odoo => "ODOO",
            Self::Quickbooks => "QUICKBOOKS",
            Self::Xero => "XERO",
            Self::Netsuite => "NETSUITE",
        };
        f.write_str(s)
    }
}

impl FromStr for ErpType {
    type Err = ErpTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(Self::None),
            "ODOO" => Ok(Self::Odoo),
            "QUICKBOOKS" => Ok(Self::Quickbooks),
            "XERO" => Ok(Self::Xero),
            "NETSUITE" => Ok(Self::Netsuite),
            other => Err(ErpTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ErpType`] string.
#[derive(Debug, Clone)]
pub struct ErpTypeParseError(pub String);

impl fmt::Display for ErpTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ERP type: {:?}", self.0)
    }
}

impl std::error::Error for ErpTypeParseError {}

// ---------------------------------------------------------------------------

/// Connection status of an ERP link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErpConnectionStatus {
    NotConnected,
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl fmt::Display for ErpConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotConnected => "NOT_CONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Error => "ERROR",
            Self::Disconnected => "DISCONNECTED",
        };
        f.write_str(s)
    }
}

impl FromStr for ErpConnectionStatus {
    type Err = ErpConnectionStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_CONNECTED" => Ok(Self::NotConnected),
            "CONNECTING" => Ok(Self::Connecting),
            "CONNECTED" => Ok(Self::Connected),
            "ERROR" => Ok(Self::Error),
            "DISCONNECTED" => Ok(Self::Disconnected),
            other => Err(ErpConnectionStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ErpConnectionStatus`] string.
#[derive(Debug, Clone)]
pub struct ErpConnectionStatusParseError(pub String);

impl fmt::Display for ErpConnectionStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ERP connection status: {:?}", self.0)
    }
}

impl std::error::Error for ErpConnectionStatusParseError {}

// ---------------------------------------------------------------------------

/// How well the ERP chart of accounts maps onto our KPI definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingHealth {
    Unknown,
    Healthy,
    Degraded,
    Broken,
}

impl fmt::Display for MappingHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "UNKNOWN",
            Self::Healthy => "HEALTHY",
            Self::Degraded => "DEGRADED",
            Self::Broken => "BROKEN",
        };
        f.write_str(s)
    }
}

impl FromStr for MappingHealth {
    type Err = MappingHealthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNKNOWN" => Ok(Self::Unknown),
            "HEALTHY" => Ok(Self::Healthy),
            "DEGRADED" => Ok(Self::Degraded),
            "BROKEN" => Ok(Self::Broken),
            other => Err(MappingHealthParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MappingHealth`] string.
#[derive(Debug, Clone)]
pub struct MappingHealthParseError(pub String);

impl fmt::Display for MappingHealthParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mapping health: {:?}", self.0)
    }
}

impl std::error::Error for MappingHealthParseError {}

// ---------------------------------------------------------------------------

/// Party responsible for completing a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneOwner {
    Hq,
    Partner,
    Client,
}

impl fmt::Display for MilestoneOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hq => "HQ",
            Self::Partner => "PARTNER",
            Self::Client => "CLIENT",
        };
        f.write_str(s)
    }
}

impl FromStr for MilestoneOwner {
    type Err = MilestoneOwnerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HQ" => Ok(Self::Hq),
            "PARTNER" => Ok(Self::Partner),
            "CLIENT" => Ok(Self::Client),
            other => Err(MilestoneOwnerParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MilestoneOwner`] string.
#[derive(Debug, Clone)]
pub struct MilestoneOwnerParseError(pub String);

impl fmt::Display for MilestoneOwnerParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid milestone owner: {:?}", self.0)
    }
}

impl std::error::Error for MilestoneOwnerParseError {}

// ---------------------------------------------------------------------------

/// Who an assignment is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentType {
    Hq,
    Partner,
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hq => "HQ",
            Self::Partner => "PARTNER",
        };
        f.write_str(s)
    }
}

impl FromStr for AssignmentType {
    type Err = AssignmentTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HQ" => Ok(Self::Hq),
            "PARTNER" => Ok(Self::Partner),
            other => Err(AssignmentTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`AssignmentType`] string.
#[derive(Debug, Clone)]
pub struct AssignmentTypeParseError(pub String);

impl fmt::Display for AssignmentTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid assignment type: {:?}", self.0)
    }
}

impl std::error::Error for AssignmentTypeParseError {}

// ---------------------------------------------------------------------------

/// Assignment priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(PriorityParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Priority`] string.
#[derive(Debug, Clone)]
pub struct PriorityParseError(pub String);

impl fmt::Display for PriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid priority: {:?}", self.0)
    }
}

impl std::error::Error for PriorityParseError {}

// ---------------------------------------------------------------------------

/// ERP data domain pulled into a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataDomain {
    Invoices,
    Bills,
    Payments,
    GeneralLedger,
    Payroll,
    Inventory,
}

impl fmt::Display for DataDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Invoices => "INVOICES",
            Self::Bills => "BILLS",
            Self::Payments => "PAYMENTS",
            Self::GeneralLedger => "GENERAL_LEDGER",
            Self::Payroll => "PAYROLL",
            Self::Inventory => "INVENTORY",
        };
        f.write_str(s)
    }
}

impl FromStr for DataDomain {
    type Err = DataDomainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVOICES" => Ok(Self::Invoices),
            "BILLS" => Ok(Self::Bills),
            "PAYMENTS" => Ok(Self::Payments),
            "GENERAL_LEDGER" => Ok(Self::GeneralLedger),
            "PAYROLL" => Ok(Self::Payroll),
            "INVENTORY" => Ok(Self::Inventory),
            other => Err(DataDomainParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`DataDomain`] string.
#[derive(Debug, Clone)]
pub struct DataDomainParseError(pub String);

impl fmt::Display for DataDomainParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid data domain: {:?}", self.0)
    }
}

impl std::error::Error for DataDomainParseError {}

// ---------------------------------------------------------------------------

impl Default for ErpType {
    fn default() -> Self {
        Self::None
    }
}

impl ErpType {
    /// `true` when no ERP integration is configured.
    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

impl DataDomain {
    /// Every data domain, in display order.
    pub const ALL: [DataDomain; 6] = [
        DataDomain::Invoices,
        DataDomain::Bills,
        DataDomain::Payments,
        DataDomain::GeneralLedger,
        DataDomain::Payroll,
        DataDomain::Inventory,
    ];
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A customer of the practice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A delivery partner that can take plan assignments.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub specialty: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A submitted service plan. Child rows live in `plan_milestones`,
/// `plan_kpis`, and `plan_assignments`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServicePlan {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub status: PlanStatus,
    pub start_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub package: String,
    pub billing_cycle: String,
    pub add_ons: Vec<String>,
    pub total_price: f64,
    pub erp_type: ErpType,
    pub data_domains: Vec<String>,
    pub governance: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A budgeted phase of a plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanMilestone {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub position: i32,
    pub sequence: i32,
    pub name: String,
    pub duration_weeks: i32,
    pub budget_percent: f64,
    pub critical_path: bool,
    pub owner: MilestoneOwner,
}

/// A KPI tracked by a plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanKpi {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub position: i32,
    pub kpi_code: String,
    pub target_value: f64,
    pub green: f64,
    pub amber: f64,
    pub red: f64,
    pub weight: f64,
}

/// Work routed to HQ staff or a partner as part of a plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanAssignment {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub position: i32,
    pub assignment_type: AssignmentType,
    pub partner_id: Option<Uuid>,
    pub sla_hours: i32,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

/// A contract signed with a customer, optionally tied to a plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub title: String,
    pub value: f64,
    pub status: ContractStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Credentials and sync state for a customer's ERP.
///
/// The password is never serialized into API responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ErpConnection {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub erp_type: ErpType,
    pub status: ErpConnectionStatus,
    pub mapping_health: MappingHealth,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub base_url: String,
    pub database_name: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub is_active: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
