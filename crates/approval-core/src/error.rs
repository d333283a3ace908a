//! Error types for the schema approval system

use thiserror::Error;

pub use approval_types::ErrorKind;

/// Fatal errors of a workflow run.
///
/// Business rejections and stale input are not errors; they are absorbed by
/// the state machine and only show up in history.
#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Schema was not approved after {iterations} iterations")]
    NotApproved { iterations: u32 },

    #[error("Workflow cancelled")]
    Cancelled,

    #[error("Workflow is no longer accepting input")]
    WorkflowClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApprovalError {
    /// Category callers can branch on
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ContractViolation(_) => ErrorKind::ContractViolation,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Self::NotApproved { .. } => ErrorKind::PlanExhausted,
            Self::Cancelled | Self::WorkflowClosed => ErrorKind::Cancelled,
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Internal(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}

impl From<approval_types::PlanError> for ApprovalError {
    fn from(e: approval_types::PlanError) -> Self {
        Self::ContractViolation(e.to_string())
    }
}

impl From<approval_types::DecisionError> for ApprovalError {
    fn from(e: approval_types::DecisionError) -> Self {
        Self::ContractViolation(e.to_string())
    }
}

impl From<config::ConfigError> for ApprovalError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result type for approval operations
pub type Result<T> = std::result::Result<T, ApprovalError>;
