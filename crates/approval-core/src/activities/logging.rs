//! Activities that only log, used by the server binary and in tests

use super::{ActivityError, ActivityResult, ApprovalActivities};
use approval_types::{
    ApprovalRecord, CompleteReviewRequest, CompletionReport, ReviewAssignment, ReviewOutcome,
    ReviewRequest, RevisionRequest, Submission, UploadSummary,
};
use async_trait::async_trait;

/// Default activity implementation with no external side effects
#[derive(Debug, Clone)]
pub struct LoggingActivities {
    storage_root: String,
}

impl LoggingActivities {
    pub fn new(storage_root: impl Into<String>) -> Self {
        Self {
            storage_root: storage_root.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn storage_location(&self, submission: &Submission) -> String {
        format!(
            "{}/{}/v{}.json",
            self.storage_root, submission.schema_id, submission.version
        )
    }
}

impl Default for LoggingActivities {
    fn default() -> Self {
        Self::new("s3://schemas")
    }
}

#[async_trait]
impl ApprovalActivities for LoggingActivities {
    async fn upload(&self, submission: &Submission) -> ActivityResult<UploadSummary> {
        let storage_location = self.storage_location(submission);
        log::info!(
            "Uploading schema {} v{} to {}",
            submission.schema_id,
            submission.version,
            storage_location
        );
        Ok(UploadSummary {
            schema_id: submission.schema_id.clone(),
            version: submission.version,
            storage_location,
            uploaded_by: submission.submitted_by.clone(),
        })
    }

    async fn dispatch_review(&self, assignment: &ReviewAssignment) -> ActivityResult<()> {
        log::info!(
            "Assigned {} of {} v{} to {}: {}",
            assignment.stage,
            assignment.submission.schema_id,
            assignment.submission.version,
            assignment.reviewer,
            assignment.instructions
        );
        Ok(())
    }

    async fn perform_review(&self, request: &ReviewRequest) -> ActivityResult<ReviewOutcome> {
        if request.decision.skip_follow_up && !request.stage.accepts_follow_up_waiver() {
            return Err(ActivityError::Invalid(format!(
                "follow-up waiver is only supported for stage Review2, got {}",
                request.stage
            )));
        }

        log::info!(
            "{} by {} in iteration {}: {}",
            request.stage,
            request.decision.reviewer,
            request.iteration,
            if request.decision.approved { "approved" } else { "rejected" }
        );
        Ok(ReviewOutcome::from_plan(request.stage, &request.decision))
    }

    async fn record_rejection(&self, request: &RevisionRequest) -> ActivityResult<()> {
        log::warn!(
            "Revision requested for {} v{} by {}: {}",
            request.submission.schema_id,
            request.submission.version,
            request.requested_by_stage,
            request.reason
        );
        Ok(())
    }

    async fn finalize(&self, record: &ApprovalRecord) -> ActivityResult<()> {
        log::info!(
            "Schema {} approved at v{} after {} attempts",
            record.schema_id,
            record.approved_version,
            record.attempts
        );
        Ok(())
    }

    async fn complete(&self, request: &CompleteReviewRequest) -> ActivityResult<CompletionReport> {
        let disapprovals = request.disapprovals();
        if !disapprovals.is_empty() {
            let reviewers: Vec<&str> = disapprovals.iter().map(|o| o.reviewer.as_str()).collect();
            return Err(ActivityError::Invalid(format!(
                "cannot complete review with unapproved outcomes from {}",
                reviewers.join(", ")
            )));
        }

        let reviewers: Vec<&str> = request.approvals.iter().map(|o| o.reviewer.as_str()).collect();
        let summary = format!(
            "Schema {} approved in iteration {} by {}",
            request.submission.schema_id,
            request.iteration,
            reviewers.join(", ")
        );
        log::info!("{}", summary);

        Ok(CompletionReport {
            submission: request.submission.clone(),
            iteration: request.iteration,
            approved: true,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approval_types::{ReviewDecisionPlan, ReviewStage};

    fn submission() -> Submission {
        Submission::new("schema-alpha", 2, "{\"type\":\"object\"}", "alice")
    }

    #[tokio::test]
    async fn test_upload_reports_storage_location() {
        let activities = LoggingActivities::new("s3://schemas/");
        let summary = activities.upload(&submission()).await.unwrap();
        assert_eq!(summary.storage_location, "s3://schemas/schema-alpha/v2.json");
        assert_eq!(summary.uploaded_by, "alice");
        assert_eq!(summary.version, 2);
    }

    #[tokio::test]
    async fn test_perform_review_echoes_plan() {
        let activities = LoggingActivities::default();
        let request = ReviewRequest {
            stage: ReviewStage::Review2,
            iteration: 1,
            decision: ReviewDecisionPlan::new("carol", true)
                .with_comments("looks good")
                .skipping_follow_up(),
        };
        let outcome = activities.perform_review(&request).await.unwrap();
        assert_eq!(outcome.stage, ReviewStage::Review2);
        assert_eq!(outcome.reviewer, "carol");
        assert_eq!(outcome.comments.as_deref(), Some("looks good"));
        assert!(!outcome.requires_follow_up());
    }

    #[tokio::test]
    async fn test_perform_review_rejects_misplaced_waiver() {
        let activities = LoggingActivities::default();
        let request = ReviewRequest {
            stage: ReviewStage::Review1A,
            iteration: 1,
            decision: ReviewDecisionPlan::new("alice", true).skipping_follow_up(),
        };
        let err = activities.perform_review(&request).await.unwrap_err();
        assert!(matches!(err, ActivityError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_complete_requires_all_approvals() {
        let activities = LoggingActivities::default();
        let approve = |stage, reviewer: &str, approved| ReviewOutcome {
            stage,
            reviewer: reviewer.to_string(),
            approved,
            comments: None,
            waive_follow_up: false,
        };

        let request = CompleteReviewRequest {
            submission: submission(),
            iteration: 1,
            approvals: vec![
                approve(ReviewStage::Review1A, "alice", true),
                approve(ReviewStage::Review1B, "bob", false),
            ],
        };
        match activities.complete(&request).await {
            Err(ActivityError::Invalid(message)) => assert!(message.contains("bob")),
            other => panic!("unexpected result: {:?}", other),
        }

        let request = CompleteReviewRequest {
            approvals: vec![
                approve(ReviewStage::Review1A, "alice", true),
                approve(ReviewStage::Review1B, "bob", true),
                approve(ReviewStage::Review2, "carol", true),
            ],
            ..request
        };
        let report = activities.complete(&request).await.unwrap();
        assert!(report.approved);
        assert_eq!(report.summary, "Schema schema-alpha approved in iteration 1 by alice, bob, carol");
    }
}
