//! Categories used to tell apart the ways a step can fail to move forward

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a non-success outcome.
///
/// `BusinessRejection` and `StaleInput` are ordinary outcomes absorbed by the
/// workflow; every other kind terminates a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    BusinessRejection,
    StaleInput,
    ContractViolation,
    RetryExhausted,
    PlanExhausted,
    Cancelled,
    Infrastructure,
}

impl ErrorKind {
    /// Whether this kind ends the run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BusinessRejection | Self::StaleInput)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BusinessRejection => "business_rejection",
            Self::StaleInput => "stale_input",
            Self::ContractViolation => "contract_violation",
            Self::RetryExhausted => "retry_exhausted",
            Self::PlanExhausted => "plan_exhausted",
            Self::Cancelled => "cancelled",
            Self::Infrastructure => "infrastructure",
        };
        f.write_str(name)
    }
}
