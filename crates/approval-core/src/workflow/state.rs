//! State owned by a single running workflow

use super::gate::ResubmissionGate;
use super::ledger::{Admission, DecisionLedger};
use approval_types::{
    HistoryEntry, HistoryEvent, IgnoreReason, IterationOutcome, Rejection, ReviewDecision,
    ReviewOutcome, Round, Submission, WorkflowPhase,
};
use chrono::{DateTime, Utc};

/// Inbound message delivered to a running workflow
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Submit(Submission),
    Decision(ReviewDecision),
}

/// Everything the state machine knows about one workflow instance.
///
/// Only the state machine task mutates it; observers read projections.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    workflow_id: String,
    phase: WorkflowPhase,
    round: Option<Round>,
    ledger: DecisionLedger,
    gate: ResubmissionGate,
    attempts: u32,
    history: Vec<HistoryEntry>,
    iterations: Vec<IterationOutcome>,
}

impl WorkflowState {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            phase: WorkflowPhase::Uploading,
            round: None,
            ledger: DecisionLedger::new(),
            gate: ResubmissionGate::new(),
            attempts: 0,
            history: Vec::new(),
            iterations: Vec::new(),
        }
    }

    /// Admit the initial submission and open the first iteration
    pub fn start(&mut self, initial: Submission, now: DateTime<Utc>) -> Option<Submission> {
        if let Err(reason) = self.gate.submit(initial) {
            self.ignore(reason, now);
        }
        let active = self.resume()?;
        self.push(HistoryEvent::Started { version: active.version }, now);
        Some(active)
    }

    pub fn apply(&mut self, signal: Signal, now: DateTime<Utc>) {
        match signal {
            Signal::Submit(submission) => {
                let schema_id = submission.schema_id.clone();
                match self.gate.submit(submission) {
                    Ok(version) => {
                        log::info!("Received schema resubmission version {} for {}", version, schema_id);
                        self.push(HistoryEvent::SubmissionQueued { version }, now);
                    }
                    Err(reason) => self.ignore(reason, now),
                }
            }
            Signal::Decision(decision) => match self.ledger.record(&decision) {
                Admission::Accepted(stage) => {
                    log::debug!(
                        "{} decided {} by {}",
                        stage,
                        if decision.approved { "approve" } else { "reject" },
                        decision.reviewer
                    );
                    self.push(
                        HistoryEvent::DecisionRecorded {
                            stage,
                            version: decision.submission_version,
                        },
                        now,
                    );
                }
                Admission::Ignored(reason) => self.ignore(reason, now),
            },
        }
    }

    pub fn push(&mut self, event: HistoryEvent, now: DateTime<Utc>) {
        self.history.push(HistoryEntry { at: now, event });
    }

    fn ignore(&mut self, reason: IgnoreReason, now: DateTime<Utc>) {
        log::warn!("{}", reason);
        self.push(HistoryEvent::Ignored { detail: reason }, now);
    }

    /// Promote a queued submission and reopen the ledger for it
    pub fn resume(&mut self) -> Option<Submission> {
        let active = self.gate.try_resume()?.clone();
        self.ledger.open(active.version);
        self.round = None;
        Some(active)
    }

    /// Count a new attempt; returns its iteration number
    pub fn begin_iteration(&mut self) -> u32 {
        self.attempts += 1;
        self.phase = WorkflowPhase::Uploading;
        self.round = None;
        self.attempts
    }

    pub fn enter_round(&mut self, round: Round) {
        self.round = Some(round);
        self.phase = WorkflowPhase::waiting_for(round);
    }

    pub fn leave_round(&mut self) {
        self.round = None;
    }

    pub fn take_round(&mut self, round: Round) -> Option<Vec<ReviewOutcome>> {
        self.ledger.take_stages(round.stages())
    }

    /// Close the active iteration and wait for a newer submission
    pub fn reject(&mut self, rejection: Rejection) {
        self.gate.reject(rejection);
        self.ledger.seal();
        self.round = None;
        self.phase = WorkflowPhase::AwaitingResubmission;
    }

    pub fn push_iteration(&mut self, outcome: IterationOutcome) {
        self.iterations.push(outcome);
    }

    pub fn set_phase(&mut self, phase: WorkflowPhase) {
        self.phase = phase;
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn round(&self) -> Option<Round> {
        self.round
    }

    pub fn ledger(&self) -> &DecisionLedger {
        &self.ledger
    }

    pub fn gate(&self) -> &ResubmissionGate {
        &self.gate
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn iterations(&self) -> &[IterationOutcome] {
        &self.iterations
    }
}
