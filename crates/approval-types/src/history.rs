//! Append-only audit trail of workflow transitions

use crate::kind::ErrorKind;
use crate::stage::{ReviewStage, Round};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an inbound decision or submission was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IgnoreReason {
    NoActiveSubmission,
    IterationClosed { version: u32 },
    VersionMismatch { received: u32, current: u32 },
    UnknownStage { stage: String },
    StageClosed { stage: ReviewStage, version: u32 },
    DuplicateDecision { stage: ReviewStage, version: u32 },
    OutdatedSubmission { received: u32, current: u32 },
}

impl IgnoreReason {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StaleInput
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveSubmission => write!(f, "Ignored decision received before any submission"),
            Self::IterationClosed { version } => {
                write!(f, "Ignored decision for v{}; awaiting resubmission", version)
            }
            Self::VersionMismatch { received, current } => write!(
                f,
                "Ignored decision for version {}; current is v{}",
                received, current
            ),
            Self::UnknownStage { stage } => write!(f, "Ignored decision for unknown stage {}", stage),
            Self::StageClosed { stage, version } => write!(
                f,
                "Ignored decision for {} on version {}; stage already collected",
                stage, version
            ),
            Self::DuplicateDecision { stage, version } => write!(
                f,
                "Ignored duplicate decision for {} on version {}",
                stage, version
            ),
            Self::OutdatedSubmission { received, current } => write!(
                f,
                "Ignored outdated submission v{}; current is v{}",
                received, current
            ),
        }
    }
}

/// A single transition or absorbed anomaly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HistoryEvent {
    Started { version: u32 },
    Uploaded { version: u32, storage_location: String },
    DecisionRecorded { stage: ReviewStage, version: u32 },
    Ignored { detail: IgnoreReason },
    RoundCollected { round: Round, version: u32 },
    FollowUpWaived { version: u32 },
    RoundThreeNotPlanned { version: u32 },
    AwaitingResubmission { check: String, version: u32 },
    SubmissionQueued { version: u32 },
    ResubmissionReceived { version: u32 },
    Approved { version: u32, attempts: u32 },
    NotApproved { iterations: u32 },
}

impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { version } => write!(f, "Workflow started with submission v{}", version),
            Self::Uploaded { version, storage_location } => write!(
                f,
                "Uploaded schema version {} to {}",
                version, storage_location
            ),
            Self::DecisionRecorded { stage, version } => {
                write!(f, "Recorded decision for {} on version {}", stage, version)
            }
            Self::Ignored { detail } => write!(f, "{}", detail),
            Self::RoundCollected { round, version } => {
                write!(f, "Collected {} decisions for version {}", round, version)
            }
            Self::FollowUpWaived { version } => {
                write!(f, "Round two reviewer waived round three for version {}", version)
            }
            Self::RoundThreeNotPlanned { version } => {
                write!(f, "Round three not planned for version {}", version)
            }
            Self::AwaitingResubmission { check, version } => write!(
                f,
                "Awaiting resubmission after {} for version {}",
                check, version
            ),
            Self::SubmissionQueued { version } => write!(f, "Queued submission v{}", version),
            Self::ResubmissionReceived { version } => {
                write!(f, "Received resubmission version {}", version)
            }
            Self::Approved { version, attempts } => write!(
                f,
                "Approved submission v{} after {} attempts",
                version, attempts
            ),
            Self::NotApproved { iterations } => {
                write!(f, "Not approved after {} iterations", iterations)
            }
        }
    }
}

/// Timestamped history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub event: HistoryEvent,
}

impl HistoryEntry {
    pub fn is_ignore(&self) -> bool {
        matches!(self.event, HistoryEvent::Ignored { .. })
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.at.to_rfc3339(), self.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_messages() {
        let event = HistoryEvent::Ignored {
            detail: IgnoreReason::VersionMismatch { received: 1, current: 2 },
        };
        assert_eq!(event.to_string(), "Ignored decision for version 1; current is v2");

        let reason = IgnoreReason::OutdatedSubmission { received: 2, current: 2 };
        assert_eq!(reason.to_string(), "Ignored outdated submission v2; current is v2");
        assert_eq!(reason.kind(), ErrorKind::StaleInput);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = HistoryEvent::Ignored {
            detail: IgnoreReason::UnknownStage { stage: "Review9".to_string() },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "ignored");
        assert_eq!(json["detail"]["reason"], "unknown_stage");
        assert_eq!(json["detail"]["stage"], "Review9");

        let parsed: HistoryEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_round_three_skip_causes_are_distinct() {
        let waived = HistoryEvent::FollowUpWaived { version: 3 };
        let unplanned = HistoryEvent::RoundThreeNotPlanned { version: 3 };
        assert_eq!(waived.to_string(), "Round two reviewer waived round three for version 3");
        assert_eq!(unplanned.to_string(), "Round three not planned for version 3");
        assert_eq!(serde_json::to_value(&unplanned).unwrap()["event"], "round_three_not_planned");
    }
}
