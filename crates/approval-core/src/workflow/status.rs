//! Read-only projection of workflow state

use super::state::WorkflowState;
use approval_types::{RoundSnapshot, StatusSnapshot};
use std::collections::BTreeMap;

pub struct StatusProjector;

impl StatusProjector {
    pub fn project(state: &WorkflowState) -> StatusSnapshot {
        let ledger = state.ledger();

        let current_round = match (state.round(), ledger.version()) {
            (Some(round), Some(version)) if ledger.is_open() => {
                let mut awaiting = Vec::new();
                let mut collected = BTreeMap::new();
                for stage in round.stages() {
                    match ledger.pending(*stage).or_else(|| ledger.completed().get(stage)) {
                        Some(outcome) => {
                            collected.insert(*stage, outcome.clone());
                        }
                        None => awaiting.push(*stage),
                    }
                }
                Some(RoundSnapshot {
                    round_name: round.name_for_version(version),
                    round,
                    submission_version: version,
                    awaiting,
                    collected,
                })
            }
            _ => None,
        };

        StatusSnapshot {
            workflow_id: state.workflow_id().to_string(),
            phase: state.phase(),
            current_round,
            awaiting_resubmission: state.gate().awaiting_resubmission(),
            active_version: state.gate().active().map(|s| s.version),
            attempts: state.attempts(),
            history: state.history().to_vec(),
            iterations: state.iterations().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::Signal;
    use approval_types::{ReviewDecision, ReviewStage, Round, Submission, WorkflowPhase};
    use chrono::Utc;

    #[test]
    fn test_round_snapshot_lists_awaiting_stages() {
        let mut state = WorkflowState::new("wf-status");
        state.start(Submission::new("orders", 3, "{}", "alice"), Utc::now());
        state.begin_iteration();
        state.enter_round(Round::One);
        state.apply(
            Signal::Decision(ReviewDecision::new(ReviewStage::Review1B, "bob", 3, true)),
            Utc::now(),
        );

        let snapshot = StatusProjector::project(&state);
        assert_eq!(snapshot.phase, WorkflowPhase::RoundOneWaiting);
        assert_eq!(snapshot.active_version, Some(3));
        assert_eq!(snapshot.attempts, 1);
        let round = snapshot.current_round.as_ref().unwrap();
        assert_eq!(round.round_name, "Round1:v3");
        assert_eq!(round.awaiting, vec![ReviewStage::Review1A]);
        assert!(round.collected.contains_key(&ReviewStage::Review1B));
        assert_eq!(snapshot.awaiting(), &[ReviewStage::Review1A]);
    }

    #[test]
    fn test_no_round_while_awaiting_resubmission() {
        let mut state = WorkflowState::new("wf-status");
        state.start(Submission::new("orders", 1, "{}", "alice"), Utc::now());
        state.begin_iteration();
        state.enter_round(Round::Two);
        state.reject(approval_types::Rejection::new(Round::Two, 1));

        let snapshot = StatusProjector::project(&state);
        assert!(snapshot.current_round.is_none());
        assert!(snapshot.awaiting_resubmission);
        assert_eq!(snapshot.phase, WorkflowPhase::AwaitingResubmission);
    }
}
