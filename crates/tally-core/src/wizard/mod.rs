//! Plan-builder wizard: stages, stage gates, and the controller that drives
//! navigation and autosave.

pub mod controller;
pub mod validate;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use controller::{PlanWizard, WizardError};
pub use validate::{SUM_TOLERANCE, StageReport, ValidationError, validate_all, validate_stage};

/// Wizard stages, in order. `Review` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Basic,
    Erp,
    Kpis,
    Milestones,
    Assignments,
    Governance,
    Pricing,
    Review,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Basic,
        Stage::Erp,
        Stage::Kpis,
        Stage::Milestones,
        Stage::Assignments,
        Stage::Governance,
        Stage::Pricing,
        Stage::Review,
    ];

    /// Zero-based position in [`Stage::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The following stage, or `None` at `Review`.
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// The preceding stage, or `None` at `Basic`.
    pub fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Erp => "erp",
            Self::Kpis => "kpis",
            Self::Milestones => "milestones",
            Self::Assignments => "assignments",
            Self::Governance => "governance",
            Self::Pricing => "pricing",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown wizard stage {0:?} (expected one of basic, erp, kpis, milestones, assignments, governance, pricing, review)")]
pub struct StageParseError(pub String);

impl FromStr for Stage {
    type Err = StageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| StageParseError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_stages_in_order() {
        assert_eq!(Stage::ALL.len(), 8);
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn next_and_prev_stop_at_ends() {
        assert_eq!(Stage::Basic.prev(), None);
        assert_eq!(Stage::Basic.next(), Some(Stage::Erp));
        assert_eq!(Stage::Pricing.next(), Some(Stage::Review));
        assert_eq!(Stage::Review.next(), None);
    }

    #[test]
    fn parse_roundtrip() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
        }
        assert!("summary".parse::<Stage>().is_err());
    }
}
