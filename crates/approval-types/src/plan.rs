//! Pre-defined review plans used by the plan-driven workflow

use crate::stage::ReviewStage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Planned decision of a single reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecisionPlan {
    pub reviewer: String,
    pub approved: bool,
    #[serde(default)]
    pub comments: Option<String>,
    /// Reviewer decided no additional review is required. Only meaningful for Review2.
    #[serde(default)]
    pub skip_follow_up: bool,
}

impl ReviewDecisionPlan {
    pub fn new(reviewer: impl Into<String>, approved: bool) -> Self {
        Self {
            reviewer: reviewer.into(),
            approved,
            comments: None,
            skip_follow_up: false,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn skipping_follow_up(mut self) -> Self {
        self.skip_follow_up = true;
        self
    }
}

/// A malformed plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("At least one review round must be provided")]
    NoRounds,
    #[error("round {0}: review3 decision must be provided when requires_review3 is true")]
    MissingReview3(usize),
    #[error("round {0}: review3 decision cannot be provided when requires_review3 is false")]
    UnexpectedReview3(usize),
}

/// Expected outcomes for a single review iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRoundPlan {
    pub schema_id: String,
    pub schema_body: String,
    pub review1_primary: ReviewDecisionPlan,
    pub review1_secondary: ReviewDecisionPlan,
    pub review2: ReviewDecisionPlan,
    pub requires_review3: bool,
    #[serde(default)]
    pub review3: Option<ReviewDecisionPlan>,
}

impl ReviewRoundPlan {
    /// Planned decision for `stage`, if the plan has one
    pub fn decision_for(&self, stage: ReviewStage) -> Option<&ReviewDecisionPlan> {
        match stage {
            ReviewStage::Review1A => Some(&self.review1_primary),
            ReviewStage::Review1B => Some(&self.review1_secondary),
            ReviewStage::Review2 => Some(&self.review2),
            ReviewStage::Review3 => self.review3.as_ref(),
        }
    }

    fn validate(&self, index: usize) -> Result<(), PlanError> {
        match (self.requires_review3, self.review3.is_some()) {
            (true, false) => Err(PlanError::MissingReview3(index)),
            (false, true) => Err(PlanError::UnexpectedReview3(index)),
            _ => Ok(()),
        }
    }
}

fn default_plan_submitter() -> String {
    "plan-runner".to_string()
}

/// Every planned review iteration, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaApprovalPlan {
    pub rounds: Vec<ReviewRoundPlan>,
    #[serde(default = "default_plan_submitter")]
    pub submitted_by: String,
}

impl SchemaApprovalPlan {
    pub fn new(rounds: Vec<ReviewRoundPlan>) -> Self {
        Self {
            rounds,
            submitted_by: default_plan_submitter(),
        }
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.rounds.is_empty() {
            return Err(PlanError::NoRounds);
        }
        self.rounds
            .iter()
            .enumerate()
            .try_for_each(|(index, round)| round.validate(index + 1))
    }
}
