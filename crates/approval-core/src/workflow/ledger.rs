//! Per-iteration bookkeeping of review decisions

use approval_types::{IgnoreReason, ReviewDecision, ReviewOutcome, ReviewStage};
use std::collections::BTreeMap;

/// Result of offering a decision to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted(ReviewStage),
    Ignored(IgnoreReason),
}

/// Decisions received for the active submission.
///
/// A stage moves from `pending` to `completed` exactly once per iteration.
/// Decisions for stages of later rounds are held as pending until their
/// round is awaited.
#[derive(Debug, Clone, Default)]
pub struct DecisionLedger {
    version: Option<u32>,
    accepting: bool,
    pending: BTreeMap<ReviewStage, ReviewOutcome>,
    completed: BTreeMap<ReviewStage, ReviewOutcome>,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new iteration for `version`
    pub fn open(&mut self, version: u32) {
        self.version = Some(version);
        self.accepting = true;
        self.pending.clear();
        self.completed.clear();
    }

    /// Stop accepting decisions until the next `open`
    pub fn seal(&mut self) {
        self.accepting = false;
        self.pending.clear();
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    pub fn is_open(&self) -> bool {
        self.accepting
    }

    pub fn record(&mut self, decision: &ReviewDecision) -> Admission {
        let Some(current) = self.version else {
            return Admission::Ignored(IgnoreReason::NoActiveSubmission);
        };

        if !self.accepting {
            return Admission::Ignored(IgnoreReason::IterationClosed {
                version: decision.submission_version,
            });
        }

        if decision.submission_version != current {
            return Admission::Ignored(IgnoreReason::VersionMismatch {
                received: decision.submission_version,
                current,
            });
        }

        let stage = match decision.parse_stage() {
            Ok(stage) => stage,
            Err(_) => {
                return Admission::Ignored(IgnoreReason::UnknownStage {
                    stage: decision.stage.clone(),
                })
            }
        };

        if self.completed.contains_key(&stage) {
            return Admission::Ignored(IgnoreReason::StageClosed {
                stage,
                version: current,
            });
        }

        if self.pending.contains_key(&stage) {
            return Admission::Ignored(IgnoreReason::DuplicateDecision {
                stage,
                version: current,
            });
        }

        self.pending
            .insert(stage, ReviewOutcome::from_decision(stage, decision));
        Admission::Accepted(stage)
    }

    /// Consume the decisions for `stages` once every one of them is pending.
    ///
    /// Returns the outcomes in the order of `stages`.
    pub fn take_stages(&mut self, stages: &[ReviewStage]) -> Option<Vec<ReviewOutcome>> {
        if !stages.iter().all(|stage| self.pending.contains_key(stage)) {
            return None;
        }

        let outcomes: Vec<ReviewOutcome> = stages
            .iter()
            .filter_map(|stage| self.pending.remove(stage))
            .collect();
        for outcome in &outcomes {
            self.completed.insert(outcome.stage, outcome.clone());
        }
        Some(outcomes)
    }

    pub fn pending(&self, stage: ReviewStage) -> Option<&ReviewOutcome> {
        self.pending.get(&stage)
    }

    pub fn completed(&self) -> &BTreeMap<ReviewStage, ReviewOutcome> {
        &self.completed
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(stage: ReviewStage, version: u32, approved: bool) -> ReviewDecision {
        ReviewDecision::new(stage, "reviewer", version, approved)
    }

    #[test]
    fn test_rejects_decisions_before_any_submission() {
        let mut ledger = DecisionLedger::new();
        assert_eq!(
            ledger.record(&decision(ReviewStage::Review1A, 1, true)),
            Admission::Ignored(IgnoreReason::NoActiveSubmission)
        );
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_version_mismatch_leaves_ledger_unchanged() {
        let mut ledger = DecisionLedger::new();
        ledger.open(2);
        assert_eq!(
            ledger.record(&decision(ReviewStage::Review1A, 1, true)),
            Admission::Ignored(IgnoreReason::VersionMismatch { received: 1, current: 2 })
        );
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_unknown_stage_is_ignored() {
        let mut ledger = DecisionLedger::new();
        ledger.open(1);
        let mut unknown = decision(ReviewStage::Review2, 1, true);
        unknown.stage = "Review4".to_string();
        assert_eq!(
            ledger.record(&unknown),
            Admission::Ignored(IgnoreReason::UnknownStage { stage: "Review4".to_string() })
        );
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_first_pending_decision_wins() {
        let mut ledger = DecisionLedger::new();
        ledger.open(1);
        assert_eq!(
            ledger.record(&decision(ReviewStage::Review2, 1, true)),
            Admission::Accepted(ReviewStage::Review2)
        );
        assert_eq!(
            ledger.record(&decision(ReviewStage::Review2, 1, false)),
            Admission::Ignored(IgnoreReason::DuplicateDecision {
                stage: ReviewStage::Review2,
                version: 1
            })
        );
        assert!(ledger.pending(ReviewStage::Review2).unwrap().approved);
    }

    #[test]
    fn test_take_stages_waits_for_every_stage() {
        let mut ledger = DecisionLedger::new();
        ledger.open(1);
        let round_one = [ReviewStage::Review1A, ReviewStage::Review1B];

        ledger.record(&decision(ReviewStage::Review1B, 1, true));
        assert!(ledger.take_stages(&round_one).is_none());

        ledger.record(&decision(ReviewStage::Review1A, 1, false));
        let outcomes = ledger.take_stages(&round_one).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].stage, ReviewStage::Review1A);
        assert_eq!(outcomes[1].stage, ReviewStage::Review1B);
        assert_eq!(ledger.pending_count(), 0);
        assert_eq!(ledger.completed().len(), 2);
    }

    #[test]
    fn test_consumed_stage_is_closed() {
        let mut ledger = DecisionLedger::new();
        ledger.open(1);
        ledger.record(&decision(ReviewStage::Review2, 1, true));
        ledger.take_stages(&[ReviewStage::Review2]).unwrap();

        assert_eq!(
            ledger.record(&decision(ReviewStage::Review2, 1, false)),
            Admission::Ignored(IgnoreReason::StageClosed {
                stage: ReviewStage::Review2,
                version: 1
            })
        );
        assert!(ledger.completed()[&ReviewStage::Review2].approved);
    }

    #[test]
    fn test_sealed_ledger_ignores_until_reopened() {
        let mut ledger = DecisionLedger::new();
        ledger.open(1);
        ledger.record(&decision(ReviewStage::Review3, 1, true));
        ledger.seal();
        assert!(!ledger.is_open());
        assert_eq!(ledger.pending_count(), 0);
        assert_eq!(
            ledger.record(&decision(ReviewStage::Review1A, 1, true)),
            Admission::Ignored(IgnoreReason::IterationClosed { version: 1 })
        );

        ledger.open(2);
        assert_eq!(ledger.version(), Some(2));
        assert!(ledger.completed().is_empty());
        assert_eq!(
            ledger.record(&decision(ReviewStage::Review1A, 2, true)),
            Admission::Accepted(ReviewStage::Review1A)
        );
    }
}
