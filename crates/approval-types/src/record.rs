//! Per-iteration audit entries and the final approval record

use crate::review::{Rejection, ReviewOutcome};
use crate::stage::ReviewStage;
use crate::submission::{Submission, UploadSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one full review iteration, approved or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationOutcome {
    pub iteration: u32,
    pub submission: Submission,
    pub upload: UploadSummary,
    /// Every stage executed in this iteration, in execution order
    pub outcomes: Vec<ReviewOutcome>,
    pub approved: bool,
    pub rejection: Option<Rejection>,
}

impl IterationOutcome {
    pub fn new(iteration: u32, submission: Submission, upload: UploadSummary) -> Self {
        Self {
            iteration,
            submission,
            upload,
            outcomes: Vec::new(),
            approved: false,
            rejection: None,
        }
    }

    pub fn outcome(&self, stage: ReviewStage) -> Option<&ReviewOutcome> {
        self.outcomes.iter().find(|o| o.stage == stage)
    }
}

/// Record of a successful approval; produced exactly once per workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub schema_id: String,
    pub approved_version: u32,
    pub attempts: u32,
    pub approvers: BTreeMap<ReviewStage, String>,
    pub completed_at: DateTime<Utc>,
    pub history: Vec<IterationOutcome>,
    /// Summary returned by the completion activity, when one was produced
    #[serde(default)]
    pub summary: Option<String>,
}

impl ApprovalRecord {
    pub fn approver(&self, stage: ReviewStage) -> Option<&str> {
        self.approvers.get(&stage).map(String::as_str)
    }

    pub fn final_iteration(&self) -> Option<&IterationOutcome> {
        self.history.last()
    }
}
