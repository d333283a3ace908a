//! Review decisions, outcomes and the payloads exchanged with activities

use crate::kind::ErrorKind;
use crate::plan::ReviewDecisionPlan;
use crate::stage::{ReviewStage, Round, UnknownStage};
use crate::submission::Submission;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decision pushed into a running workflow by a reviewer.
///
/// The stage is kept as its wire name so that decisions for unknown stages
/// can be audited and dropped instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub stage: String,
    pub reviewer: String,
    pub submission_version: u32,
    pub approved: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub waive_follow_up: bool,
}

/// Decision rejected before it reaches a workflow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("follow-up waiver is only supported for stage Review2, got {0}")]
    WaiverNotAllowed(ReviewStage),
}

impl ReviewDecision {
    pub fn new(
        stage: ReviewStage,
        reviewer: impl Into<String>,
        submission_version: u32,
        approved: bool,
    ) -> Self {
        Self {
            stage: stage.as_str().to_string(),
            reviewer: reviewer.into(),
            submission_version,
            approved,
            comment: None,
            waive_follow_up: false,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn waiving_follow_up(mut self) -> Self {
        self.waive_follow_up = true;
        self
    }

    /// Decision equivalent to an outcome produced for `version`
    pub fn from_outcome(outcome: &ReviewOutcome, version: u32) -> Self {
        Self {
            stage: outcome.stage.as_str().to_string(),
            reviewer: outcome.reviewer.clone(),
            submission_version: version,
            approved: outcome.approved,
            comment: outcome.comments.clone(),
            waive_follow_up: outcome.waive_follow_up,
        }
    }

    pub fn parse_stage(&self) -> Result<ReviewStage, UnknownStage> {
        self.stage.parse()
    }

    /// Check caller contracts that do not depend on workflow state.
    ///
    /// Unknown stages pass: they are stale input, not a contract violation.
    pub fn validate(&self) -> Result<(), DecisionError> {
        match self.parse_stage() {
            Ok(stage) if self.waive_follow_up && !stage.accepts_follow_up_waiver() => {
                Err(DecisionError::WaiverNotAllowed(stage))
            }
            _ => Ok(()),
        }
    }
}

/// A decision accepted for a known stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub stage: ReviewStage,
    pub reviewer: String,
    pub approved: bool,
    pub comments: Option<String>,
    #[serde(default)]
    pub waive_follow_up: bool,
}

impl ReviewOutcome {
    pub fn from_decision(stage: ReviewStage, decision: &ReviewDecision) -> Self {
        Self {
            stage,
            reviewer: decision.reviewer.clone(),
            approved: decision.approved,
            comments: decision.comment.clone(),
            waive_follow_up: decision.waive_follow_up,
        }
    }

    pub fn from_plan(stage: ReviewStage, plan: &ReviewDecisionPlan) -> Self {
        Self {
            stage,
            reviewer: plan.reviewer.clone(),
            approved: plan.approved,
            comments: plan.comments.clone(),
            waive_follow_up: plan.skip_follow_up,
        }
    }

    /// Whether a subsequent review stage must be executed
    pub fn requires_follow_up(&self) -> bool {
        !self.waive_follow_up
    }
}

/// Review task sent to a reviewer in live mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAssignment {
    pub stage: ReviewStage,
    pub reviewer: String,
    pub submission: Submission,
    pub instructions: String,
}

impl ReviewAssignment {
    pub fn new(stage: ReviewStage, reviewer: impl Into<String>, submission: Submission) -> Self {
        Self {
            stage,
            reviewer: reviewer.into(),
            submission,
            instructions: stage.instructions().to_string(),
        }
    }
}

/// Review task carrying its planned decision (plan mode)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub stage: ReviewStage,
    pub iteration: u32,
    pub decision: ReviewDecisionPlan,
}

/// A round that did not approve the active submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub round: Round,
    pub version: u32,
    pub reason: String,
}

impl Rejection {
    pub fn new(round: Round, version: u32) -> Self {
        Self {
            round,
            version,
            reason: round.rejection_reason().to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::BusinessRejection
    }
}

/// Payload for the rejection-recording activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRequest {
    pub submission: Submission,
    pub reason: String,
    pub requested_by_stage: String,
}

impl RevisionRequest {
    pub fn for_rejection(submission: Submission, rejection: &Rejection) -> Self {
        Self {
            submission,
            reason: rejection.reason.clone(),
            requested_by_stage: rejection.round.check_name().to_string(),
        }
    }
}

/// Input for the plan-mode completion activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteReviewRequest {
    pub submission: Submission,
    pub iteration: u32,
    pub approvals: Vec<ReviewOutcome>,
}

impl CompleteReviewRequest {
    /// Reviewers who did not approve, if any
    pub fn disapprovals(&self) -> Vec<&ReviewOutcome> {
        self.approvals.iter().filter(|o| !o.approved).collect()
    }
}

/// Final approval summary produced by the completion activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub submission: Submission,
    pub iteration: u32,
    pub approved: bool,
    pub summary: String,
}
