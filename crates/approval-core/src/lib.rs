//! Schema Approval Core Library
//!
//! Review state machine for versioned schema submissions: two parallel
//! first-round reviews, a senior review, an optional compliance review and
//! resubmission after any rejection.

pub mod activities;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod paths;
pub mod retry;
pub mod workflow;

// Re-export main types for easy access
pub use activities::{ActivityError, ActivityResult, ApprovalActivities, LoggingActivities};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ApprovalConfig;
pub use error::{ApprovalError, ErrorKind, Result};
pub use retry::RetryPolicy;

pub use workflow::{
    spawn_live, spawn_plan, ApprovalStateMachine, SchemaApprovalInput, WorkflowHandle,
    WorkflowOptions,
};

pub use approval_types as types;
