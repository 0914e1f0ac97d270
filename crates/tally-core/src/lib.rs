//! Domain logic for tally: the plan-builder wizard (draft store, stage
//! validators, controller, pricing), plan submission, the Odoo ERP client
//! and KPI aggregation, ERP connection lifecycle, and outbound notices.

pub mod connection;
pub mod draft;
pub mod erp;
pub mod notify;
pub mod plan;
pub mod pricing;
pub mod wizard;
