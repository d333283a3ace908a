//! Shared types for the schema approval workflow

pub mod history;
pub mod kind;
pub mod plan;
pub mod record;
pub mod review;
pub mod stage;
pub mod status;
pub mod submission;

pub use history::{HistoryEntry, HistoryEvent, IgnoreReason};
pub use kind::ErrorKind;
pub use plan::{PlanError, ReviewDecisionPlan, ReviewRoundPlan, SchemaApprovalPlan};
pub use record::{ApprovalRecord, IterationOutcome};
pub use review::{
    CompleteReviewRequest, CompletionReport, DecisionError, Rejection, ReviewAssignment,
    ReviewDecision, ReviewOutcome, ReviewRequest, RevisionRequest,
};
pub use stage::{ReviewStage, Round, UnknownStage};
pub use status::{RoundSnapshot, StatusSnapshot, WorkflowPhase};
pub use submission::{Submission, UploadSummary};
