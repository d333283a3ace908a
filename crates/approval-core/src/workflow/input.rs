//! Inputs of a live approval workflow

use crate::config::ReviewerConfig;
use crate::error::{ApprovalError, Result};
use approval_types::{ReviewStage, Submission};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaApprovalInput {
    pub initial_submission: Submission,
    pub stage_one_reviewers: Vec<String>,
    pub stage_two_reviewer: String,
    pub stage_three_reviewer: String,
}

impl SchemaApprovalInput {
    pub fn from_config(initial_submission: Submission, reviewers: &ReviewerConfig) -> Self {
        Self {
            initial_submission,
            stage_one_reviewers: reviewers.stage_one.clone(),
            stage_two_reviewer: reviewers.stage_two.clone(),
            stage_three_reviewer: reviewers.stage_three.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.stage_one_reviewers.len() != 2 {
            return Err(ApprovalError::ContractViolation(format!(
                "stage_one_reviewers must contain exactly two reviewers, got {}",
                self.stage_one_reviewers.len()
            )));
        }
        Ok(())
    }

    /// Reviewer assigned to `stage`
    pub fn reviewer_for(&self, stage: ReviewStage) -> Option<&str> {
        match stage {
            ReviewStage::Review1A => self.stage_one_reviewers.first().map(String::as_str),
            ReviewStage::Review1B => self.stage_one_reviewers.get(1).map(String::as_str),
            ReviewStage::Review2 => Some(&self.stage_two_reviewer),
            ReviewStage::Review3 => Some(&self.stage_three_reviewer),
        }
    }
}
