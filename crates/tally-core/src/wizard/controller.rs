//! Stage navigation over a persisted plan draft.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::draft::{DraftError, DraftStore, PlanDraft, StoredDraft};
use crate::plan::PlanSubmission;

use super::validate::{StageReport, ValidationError, validate_all, validate_stage};
use super::Stage;

#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error("already at the first stage")]
    AlreadyAtStart,

    #[error("already at review; submit the plan instead")]
    AlreadyAtEnd,

    #[error("cannot jump to {target} from {current}: complete the stages in between first")]
    JumpBlocked { target: Stage, current: Stage },
}

/// The plan-builder wizard bound to one draft key.
///
/// Every mutation is written through to the store before returning.
pub struct PlanWizard {
    store: Arc<dyn DraftStore>,
    key: String,
    draft: PlanDraft,
    current: Stage,
    completed: BTreeSet<Stage>,
    review_reached: bool,
    version: Option<u64>,
}

impl PlanWizard {
    /// Resume the draft stored under `key`, or start a fresh one.
    ///
    /// Items without an ID are given one; if any were generated the
    /// reconciled draft is saved straight away.
    pub fn open(store: Arc<dyn DraftStore>, key: &str) -> Result<Self, WizardError> {
        let stored = store.load(key)?;
        let mut wizard = Self {
            store,
            key: key.to_owned(),
            draft: PlanDraft::default(),
            current: Stage::Basic,
            completed: BTreeSet::new(),
            review_reached: false,
            version: None,
        };

        if let Some(stored) = stored {
            wizard.version = Some(stored.version);
            wizard.current = stored.current_stage;
            wizard.completed = stored.completed.into_iter().collect();
            wizard.review_reached = stored.review_reached || stored.current_stage == Stage::Review;
            wizard.draft = stored.draft;

            let generated = wizard.draft.reconcile();
            if generated > 0 {
                debug!(key, generated, "assigned ids to draft items");
                wizard.persist()?;
            }
        }
        Ok(wizard)
    }

    pub fn draft(&self) -> &PlanDraft {
        &self.draft
    }

    pub fn current_stage(&self) -> Stage {
        self.current
    }

    pub fn completed(&self) -> impl Iterator<Item = Stage> + '_ {
        self.completed.iter().copied()
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    pub fn review_reached(&self) -> bool {
        self.review_reached
    }

    /// Version of the stored draft this wizard last wrote or read.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Edit the draft in place and save it.
    ///
    /// Completed stages stay completed; their gates run again on submission.
    pub fn update<F>(&mut self, edit: F) -> Result<(), WizardError>
    where
        F: FnOnce(&mut PlanDraft),
    {
        let mut step = self.step();
        edit(&mut step.draft);
        step.draft.reconcile();
        self.commit(step)
    }

    /// Validate the current stage and move to the next one.
    pub fn next(&mut self) -> Result<StageReport, WizardError> {
        let Some(next) = self.current.next() else {
            return Err(WizardError::AlreadyAtEnd);
        };
        let report = validate_stage(self.current, &self.draft)?;
        let mut step = self.step();
        step.completed.insert(self.current);
        step.move_to(next);
        self.commit(step)?;
        Ok(report)
    }

    pub fn prev(&mut self) -> Result<Stage, WizardError> {
        let prev = self.current.prev().ok_or(WizardError::AlreadyAtStart)?;
        let mut step = self.step();
        step.move_to(prev);
        self.commit(step)?;
        Ok(prev)
    }

    /// Go directly to `target`.
    ///
    /// Allowed once review has been reached, when moving backwards, or when
    /// the target stage is already completed.
    pub fn jump(&mut self, target: Stage) -> Result<(), WizardError> {
        let allowed =
            self.review_reached || target <= self.current || self.completed.contains(&target);
        if !allowed {
            return Err(WizardError::JumpBlocked {
                target,
                current: self.current,
            });
        }
        let mut step = self.step();
        step.move_to(target);
        self.commit(step)
    }

    pub fn total_price(&self) -> f64 {
        self.draft.total_price()
    }

    /// Run every gate and assemble the payload for plan creation.
    pub fn submission(&self) -> Result<PlanSubmission, WizardError> {
        validate_all(&self.draft)?;
        Ok(PlanSubmission::from_draft(self.draft.clone()))
    }

    /// Discard the stored draft and start over at `basic`.
    pub fn clear(&mut self) -> Result<(), WizardError> {
        self.store.clear(&self.key)?;
        self.draft = PlanDraft::default();
        self.current = Stage::Basic;
        self.completed.clear();
        self.review_reached = false;
        self.version = None;
        info!(key = %self.key, "draft cleared");
        Ok(())
    }

    fn persist(&mut self) -> Result<(), WizardError> {
        self.commit(self.step())
    }

    fn step(&self) -> Step {
        Step {
            draft: self.draft.clone(),
            current: self.current,
            completed: self.completed.clone(),
            review_reached: self.review_reached,
        }
    }

    /// Save `step` and adopt it. A failed save leaves the wizard untouched.
    fn commit(&mut self, step: Step) -> Result<(), WizardError> {
        let stored = StoredDraft {
            version: self.version.unwrap_or(0),
            saved_at: Utc::now(),
            current_stage: step.current,
            completed: step.completed.iter().copied().collect(),
            review_reached: step.review_reached,
            draft: step.draft,
        };
        let version = self.store.save(&self.key, &stored, self.version)?;
        self.version = Some(version);
        self.draft = stored.draft;
        self.current = step.current;
        self.completed = step.completed;
        self.review_reached = step.review_reached;
        Ok(())
    }
}

/// Pending wizard state, built before it is saved.
struct Step {
    draft: PlanDraft,
    current: Stage,
    completed: BTreeSet<Stage>,
    review_reached: bool,
}

impl Step {
    fn move_to(&mut self, stage: Stage) {
        self.current = stage;
        if stage == Stage::Review {
            self.review_reached = true;
        }
    }
}
