//! Remote collaborators invoked by the approval state machine

use approval_types::{
    ApprovalRecord, CompleteReviewRequest, CompletionReport, ReviewAssignment, ReviewOutcome,
    ReviewRequest, RevisionRequest, Submission, UploadSummary,
};
use async_trait::async_trait;
use thiserror::Error;

pub mod logging;

pub use logging::LoggingActivities;

/// Failure reported by an activity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivityError {
    /// Worth retrying: network errors, timeouts, unavailable services
    #[error("transient failure: {0}")]
    Transient(String),

    /// The request itself is wrong; retrying cannot help
    #[error("invalid input: {0}")]
    Invalid(String),
}

pub type ActivityResult<T> = std::result::Result<T, ActivityError>;

/// Side effects of the approval workflow.
///
/// Every call is made under the workflow's retry policy, so implementations
/// should be idempotent for the same payload. Live workflows use
/// `dispatch_review` and `finalize`; plan workflows use `perform_review`
/// and `complete`.
#[async_trait]
pub trait ApprovalActivities: Send + Sync {
    /// Store the schema body and report where it landed
    async fn upload(&self, submission: &Submission) -> ActivityResult<UploadSummary>;

    /// Notify a reviewer of a pending review; the decision arrives later as a signal
    async fn dispatch_review(&self, assignment: &ReviewAssignment) -> ActivityResult<()>;

    /// Carry out a planned review and return its outcome
    async fn perform_review(&self, request: &ReviewRequest) -> ActivityResult<ReviewOutcome>;

    /// Ask the submitter for a revision
    async fn record_rejection(&self, request: &RevisionRequest) -> ActivityResult<()>;

    /// Persist the approval record of a live workflow
    async fn finalize(&self, record: &ApprovalRecord) -> ActivityResult<()>;

    /// Summarise an approved plan iteration
    async fn complete(&self, request: &CompleteReviewRequest) -> ActivityResult<CompletionReport>;
}
