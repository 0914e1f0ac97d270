//! Service packages, add-ons, and the derived plan price.
//!
//! The total price is never stored in a draft; it is recomputed from the
//! package and add-on selection whenever it is needed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Base service package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Package {
    Essentials,
    Growth,
    Enterprise,
}

impl Package {
    /// Monthly fee in the practice's billing currency.
    pub fn monthly_fee(self) -> f64 {
        match self {
            Self::Essentials => 2_500.0,
            Self::Growth => 5_000.0,
            Self::Enterprise => 9_500.0,
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Essentials => "ESSENTIALS",
            Self::Growth => "GROWTH",
            Self::Enterprise => "ENTERPRISE",
        })
    }
}

/// Optional service bolted onto a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddOn {
    FpaModeling,
    TaxAdvisory,
    PayrollOversight,
    BoardReporting,
    ErpIntegration,
}

impl AddOn {
    /// Monthly fee in the practice's billing currency.
    pub fn monthly_fee(self) -> f64 {
        match self {
            Self::FpaModeling => 1_200.0,
            Self::TaxAdvisory => 900.0,
            Self::PayrollOversight => 600.0,
            Self::BoardReporting => 750.0,
            Self::ErpIntegration => 1_500.0,
        }
    }
}

impl fmt::Display for AddOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FpaModeling => "FPA_MODELING",
            Self::TaxAdvisory => "TAX_ADVISORY",
            Self::PayrollOversight => "PAYROLL_OVERSIGHT",
            Self::BoardReporting => "BOARD_REPORTING",
            Self::ErpIntegration => "ERP_INTEGRATION",
        })
    }
}

/// How often the customer is invoiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Annual,
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Monthly => "MONTHLY",
            Self::Quarterly => "QUARTERLY",
            Self::Annual => "ANNUAL",
        })
    }
}

/// Pricing stage of the plan draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingSelection {
    pub package: Option<Package>,
    pub add_ons: Vec<AddOn>,
    pub billing_cycle: Option<BillingCycle>,
}

impl PricingSelection {
    /// Monthly total: package fee plus every selected add-on. A duplicated
    /// add-on is only charged once.
    pub fn total_price(&self) -> f64 {
        let package = self.package.map_or(0.0, Package::monthly_fee);
        let mut seen = Vec::with_capacity(self.add_ons.len());
        let mut add_ons = 0.0;
        for add_on in &self.add_ons {
            if !seen.contains(add_on) {
                seen.push(*add_on);
                add_ons += add_on.monthly_fee();
            }
        }
        package + add_ons
    }
}
