//! Read-only workflow status exposed to observers

use crate::history::HistoryEntry;
use crate::record::IterationOutcome;
use crate::review::ReviewOutcome;
use crate::stage::{ReviewStage, Round};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position of a workflow in the approval state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowPhase {
    Uploading,
    RoundOneWaiting,
    RoundTwoWaiting,
    RoundThreeWaiting,
    Finalizing,
    AwaitingResubmission,
    Completed,
    Exhausted,
    Failed,
    Cancelled,
}

impl WorkflowPhase {
    /// Phase spent waiting for the decisions of `round`
    pub fn waiting_for(round: Round) -> Self {
        match round {
            Round::One => Self::RoundOneWaiting,
            Round::Two => Self::RoundTwoWaiting,
            Round::Three => Self::RoundThreeWaiting,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Exhausted | Self::Failed | Self::Cancelled
        )
    }
}

/// Snapshot of the round currently collecting decisions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round_name: String,
    pub round: Round,
    pub submission_version: u32,
    pub awaiting: Vec<ReviewStage>,
    pub collected: BTreeMap<ReviewStage, ReviewOutcome>,
}

/// Full status of a workflow instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub workflow_id: String,
    pub phase: WorkflowPhase,
    pub current_round: Option<RoundSnapshot>,
    pub awaiting_resubmission: bool,
    pub active_version: Option<u32>,
    pub attempts: u32,
    pub history: Vec<HistoryEntry>,
    pub iterations: Vec<IterationOutcome>,
}

impl StatusSnapshot {
    /// Stages still outstanding in the active round
    pub fn awaiting(&self) -> &[ReviewStage] {
        self.current_round
            .as_ref()
            .map(|r| r.awaiting.as_slice())
            .unwrap_or(&[])
    }

    pub fn ignored_count(&self) -> usize {
        self.history.iter().filter(|e| e.is_ignore()).count()
    }
}
