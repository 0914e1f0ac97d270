pub mod contracts;
pub mod customers;
pub mod erp_connections;
pub mod partners;
pub mod plans;
