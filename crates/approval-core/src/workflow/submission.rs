//! Building and uploading submissions

use crate::activities::ApprovalActivities;
use crate::error::{ApprovalError, Result};
use crate::retry::RetryPolicy;
use approval_types::{ReviewRoundPlan, Submission, UploadSummary};

pub struct SubmissionBuilder;

impl SubmissionBuilder {
    /// Validate a caller-provided submission
    pub fn initial(submission: Submission) -> Result<Submission> {
        if submission.schema_id.trim().is_empty() {
            return Err(ApprovalError::ContractViolation(
                "submission schema_id is required".to_string(),
            ));
        }
        if submission.version == 0 {
            return Err(ApprovalError::ContractViolation(
                "submission version must be at least 1".to_string(),
            ));
        }
        Ok(submission)
    }

    /// Submission for a planned round; its version is the iteration number
    pub fn from_plan(round: &ReviewRoundPlan, iteration: u32, submitted_by: &str) -> Submission {
        Submission::new(&round.schema_id, iteration, &round.schema_body, submitted_by)
            .with_description(format!("Planned review iteration {}", iteration))
    }

    pub async fn upload<A>(
        activities: &A,
        retry: &RetryPolicy,
        submission: &Submission,
    ) -> Result<UploadSummary>
    where
        A: ApprovalActivities + ?Sized,
    {
        log::info!(
            "Uploading schema {} version {}",
            submission.schema_id,
            submission.version
        );
        retry.run("upload", || activities.upload(submission)).await
    }
}
