//! Approval state machine driving rounds, rejections and resubmissions

use super::dispatcher::ReviewDispatcher;
use super::handle::{WorkflowHandle, WorkflowOptions};
use super::input::SchemaApprovalInput;
use super::state::{Signal, WorkflowState};
use super::status::StatusProjector;
use super::submission::SubmissionBuilder;
use crate::activities::ApprovalActivities;
use crate::clock::Clock;
use crate::error::{ApprovalError, ErrorKind, Result};
use crate::retry::RetryPolicy;
use approval_types::{
    ApprovalRecord, CompleteReviewRequest, HistoryEvent, IterationOutcome, Rejection,
    ReviewAssignment, ReviewDecision, ReviewOutcome, ReviewRequest, ReviewRoundPlan,
    RevisionRequest, Round, SchemaApprovalPlan, StatusSnapshot, Submission, WorkflowPhase,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Where review decisions of an iteration come from
enum ReviewSource<'a> {
    /// Reviewers are notified and answer through signals
    Live(&'a SchemaApprovalInput),
    /// Decisions are taken from a pre-defined round plan
    Plan(&'a ReviewRoundPlan),
}

enum Verdict {
    Approved,
    Rejected(Rejection),
}

/// Single-owner driver of one workflow instance.
///
/// Signals are only consumed while waiting for a round or a resubmission,
/// and the status channel is refreshed after every mutation.
pub struct ApprovalStateMachine<A: ApprovalActivities> {
    activities: Arc<A>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    max_live_iterations: Option<u32>,
    state: WorkflowState,
    signals: mpsc::UnboundedReceiver<Signal>,
    status: watch::Sender<StatusSnapshot>,
    cancel: CancellationToken,
}

impl<A: ApprovalActivities> ApprovalStateMachine<A> {
    /// Create a machine and the handle used to talk to it
    pub fn new(activities: Arc<A>, options: WorkflowOptions) -> (Self, WorkflowHandle) {
        let workflow_id = options
            .workflow_id
            .unwrap_or_else(|| format!("schema-approval-{}", Uuid::new_v4()));
        let state = WorkflowState::new(workflow_id.clone());
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(StatusProjector::project(&state));
        let cancel = CancellationToken::new();

        let handle = WorkflowHandle::new(workflow_id, signal_tx, status_rx, cancel.clone());
        let machine = Self {
            activities,
            retry: options.retry,
            clock: options.clock,
            max_live_iterations: options.max_live_iterations,
            state,
            signals,
            status,
            cancel,
        };
        (machine, handle)
    }

    /// Run a workflow whose decisions arrive as signals
    pub async fn run_live(mut self, input: SchemaApprovalInput) -> Result<ApprovalRecord> {
        let result = self.drive_live(&input).await;
        self.finish(&result);
        result
    }

    /// Run a workflow whose decisions come from `plan`
    pub async fn run_plan(mut self, plan: SchemaApprovalPlan) -> Result<ApprovalRecord> {
        let result = self.drive_plan(&plan).await;
        self.finish(&result);
        result
    }

    async fn drive_live(&mut self, input: &SchemaApprovalInput) -> Result<ApprovalRecord> {
        input.validate()?;
        let initial = SubmissionBuilder::initial(input.initial_submission.clone())?;
        log::info!(
            "Starting workflow {} for schema {} v{}",
            self.state.workflow_id(),
            initial.schema_id,
            initial.version
        );

        let now = self.clock.now();
        let mut submission = self.state.start(initial, now).ok_or_else(|| {
            ApprovalError::Internal("initial submission was not admitted".to_string())
        })?;
        self.publish();

        let source = ReviewSource::Live(input);
        loop {
            if self.run_iteration(&submission, &source).await? {
                let record = self.build_record(&submission, None)?;
                self.state.set_phase(WorkflowPhase::Finalizing);
                self.publish();
                let activities = self.activities.as_ref();
                guarded(
                    &self.cancel,
                    self.retry.run("finalize", || activities.finalize(&record)),
                )
                .await?;
                self.approved(&record);
                return Ok(record);
            }

            if let Some(limit) = self.max_live_iterations {
                if self.state.attempts() >= limit {
                    return Err(self.not_approved());
                }
            }

            submission = self.await_resubmission().await?;
        }
    }

    async fn drive_plan(&mut self, plan: &SchemaApprovalPlan) -> Result<ApprovalRecord> {
        plan.validate()?;
        log::info!(
            "Starting planned workflow {} with {} rounds",
            self.state.workflow_id(),
            plan.rounds.len()
        );

        for (round_plan, iteration) in plan.rounds.iter().zip(1u32..) {
            let candidate = SubmissionBuilder::from_plan(round_plan, iteration, &plan.submitted_by);
            let now = self.clock.now();
            let admitted = if iteration == 1 {
                self.state.start(candidate, now)
            } else {
                self.state.apply(Signal::Submit(candidate), now);
                self.resume()
            };
            let submission = admitted.ok_or_else(|| {
                ApprovalError::Internal(format!("planned submission v{} was not admitted", iteration))
            })?;
            self.publish();

            if self.run_iteration(&submission, &ReviewSource::Plan(round_plan)).await? {
                let approvals = self.approved_outcomes()?;
                self.state.set_phase(WorkflowPhase::Finalizing);
                self.publish();

                let request = CompleteReviewRequest {
                    submission: submission.clone(),
                    iteration: self.state.attempts(),
                    approvals,
                };
                let activities = self.activities.as_ref();
                let report = guarded(
                    &self.cancel,
                    self.retry.run("complete", || activities.complete(&request)),
                )
                .await?;

                let record = self.build_record(&submission, Some(report.summary))?;
                self.approved(&record);
                return Ok(record);
            }
        }

        Err(self.not_approved())
    }

    /// Upload and run every required round; returns whether the iteration approved
    async fn run_iteration(
        &mut self,
        submission: &Submission,
        source: &ReviewSource<'_>,
    ) -> Result<bool> {
        let iteration = self.state.begin_iteration();
        self.publish();
        log::info!(
            "Starting review attempt {} for schema {}",
            iteration,
            submission.schema_id
        );

        let activities = self.activities.as_ref();
        let upload = guarded(
            &self.cancel,
            SubmissionBuilder::upload(activities, &self.retry, submission),
        )
        .await?;
        let now = self.clock.now();
        self.state.push(
            HistoryEvent::Uploaded {
                version: submission.version,
                storage_location: upload.storage_location.clone(),
            },
            now,
        );
        self.publish();

        let mut entry = IterationOutcome::new(iteration, submission.clone(), upload);
        let verdict = self
            .collect_rounds(submission, source, iteration, &mut entry.outcomes)
            .await?;

        match verdict {
            Verdict::Approved => {
                entry.approved = true;
                self.state.push_iteration(entry);
                self.publish();
                Ok(true)
            }
            Verdict::Rejected(rejection) => {
                log::warn!(
                    "Schema {} v{} rejected in {}: {}",
                    submission.schema_id,
                    submission.version,
                    rejection.round,
                    rejection.reason
                );
                let request = RevisionRequest::for_rejection(submission.clone(), &rejection);
                let activities = self.activities.as_ref();
                guarded(
                    &self.cancel,
                    self.retry
                        .run("record_rejection", || activities.record_rejection(&request)),
                )
                .await?;

                entry.rejection = Some(rejection.clone());
                self.state.push_iteration(entry);
                let now = self.clock.now();
                self.state.push(
                    HistoryEvent::AwaitingResubmission {
                        check: rejection.round.check_name().to_string(),
                        version: submission.version,
                    },
                    now,
                );
                self.state.reject(rejection);
                self.publish();
                Ok(false)
            }
        }
    }

    async fn collect_rounds(
        &mut self,
        submission: &Submission,
        source: &ReviewSource<'_>,
        iteration: u32,
        outcomes: &mut Vec<ReviewOutcome>,
    ) -> Result<Verdict> {
        let version = submission.version;

        let round_one = self.run_round(Round::One, submission, source, iteration).await?;
        outcomes.extend(round_one.iter().cloned());
        if !round_one.iter().all(|o| o.approved) {
            return Ok(Verdict::Rejected(Rejection::new(Round::One, version)));
        }

        let round_two = self.run_round(Round::Two, submission, source, iteration).await?;
        outcomes.extend(round_two.iter().cloned());
        if !round_two.iter().all(|o| o.approved) {
            return Ok(Verdict::Rejected(Rejection::new(Round::Two, version)));
        }

        let follow_up = round_two.iter().any(ReviewOutcome::requires_follow_up);
        let planned = match source {
            ReviewSource::Live(_) => true,
            ReviewSource::Plan(round_plan) => round_plan.requires_review3,
        };

        if !planned || !follow_up {
            let event = if planned {
                HistoryEvent::FollowUpWaived { version }
            } else {
                HistoryEvent::RoundThreeNotPlanned { version }
            };
            let now = self.clock.now();
            self.state.push(event, now);
            return Ok(Verdict::Approved);
        }

        let round_three = self.run_round(Round::Three, submission, source, iteration).await?;
        outcomes.extend(round_three.iter().cloned());
        if !round_three.iter().all(|o| o.approved) {
            return Ok(Verdict::Rejected(Rejection::new(Round::Three, version)));
        }

        Ok(Verdict::Approved)
    }

    async fn run_round(
        &mut self,
        round: Round,
        submission: &Submission,
        source: &ReviewSource<'_>,
        iteration: u32,
    ) -> Result<Vec<ReviewOutcome>> {
        self.state.enter_round(round);
        self.publish();

        let outcomes = match source {
            ReviewSource::Live(input) => {
                let assignments = round
                    .stages()
                    .iter()
                    .map(|stage| {
                        input
                            .reviewer_for(*stage)
                            .map(|reviewer| {
                                ReviewAssignment::new(*stage, reviewer, submission.clone())
                            })
                            .ok_or_else(|| {
                                ApprovalError::ContractViolation(format!(
                                    "no reviewer configured for {}",
                                    stage
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;

                let dispatcher = ReviewDispatcher::new(self.activities.as_ref(), &self.retry);
                guarded(&self.cancel, dispatcher.dispatch(&assignments)).await?;
                self.await_round(round).await?
            }
            ReviewSource::Plan(round_plan) => {
                let requests = round
                    .stages()
                    .iter()
                    .map(|stage| {
                        round_plan
                            .decision_for(*stage)
                            .map(|decision| ReviewRequest {
                                stage: *stage,
                                iteration,
                                decision: decision.clone(),
                            })
                            .ok_or_else(|| {
                                ApprovalError::ContractViolation(format!(
                                    "round {} has no planned decision for {}",
                                    iteration, stage
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;

                let dispatcher = ReviewDispatcher::new(self.activities.as_ref(), &self.retry);
                let performed = guarded(&self.cancel, dispatcher.perform(&requests)).await?;

                let now = self.clock.now();
                for outcome in &performed {
                    let decision = ReviewDecision::from_outcome(outcome, submission.version);
                    decision.validate()?;
                    self.state.apply(Signal::Decision(decision), now);
                }
                self.state.take_round(round).ok_or_else(|| {
                    ApprovalError::ContractViolation(format!(
                        "performed reviews do not cover {} of iteration {}",
                        round, iteration
                    ))
                })?
            }
        };

        let now = self.clock.now();
        self.state.push(
            HistoryEvent::RoundCollected {
                round,
                version: submission.version,
            },
            now,
        );
        self.state.leave_round();
        self.publish();
        Ok(outcomes)
    }

    /// Consume signals until every stage of `round` has a decision
    async fn await_round(&mut self, round: Round) -> Result<Vec<ReviewOutcome>> {
        loop {
            if let Some(outcomes) = self.state.take_round(round) {
                return Ok(outcomes);
            }
            self.consume_signal().await?;
        }
    }

    /// Consume signals until a newer submission can be promoted
    async fn await_resubmission(&mut self) -> Result<Submission> {
        loop {
            if let Some(submission) = self.resume() {
                self.publish();
                return Ok(submission);
            }
            self.consume_signal().await?;
        }
    }

    async fn consume_signal(&mut self) -> Result<()> {
        let signal = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApprovalError::Cancelled),
            signal = self.signals.recv() => signal.ok_or(ApprovalError::Cancelled)?,
        };
        let now = self.clock.now();
        self.state.apply(signal, now);
        self.publish();
        Ok(())
    }

    fn resume(&mut self) -> Option<Submission> {
        let submission = self.state.resume()?;
        let now = self.clock.now();
        self.state.push(
            HistoryEvent::ResubmissionReceived {
                version: submission.version,
            },
            now,
        );
        Some(submission)
    }

    fn approved_outcomes(&self) -> Result<Vec<ReviewOutcome>> {
        self.state
            .iterations()
            .last()
            .filter(|entry| entry.approved)
            .map(|entry| entry.outcomes.clone())
            .ok_or_else(|| ApprovalError::Internal("no approved iteration recorded".to_string()))
    }

    fn build_record(&self, submission: &Submission, summary: Option<String>) -> Result<ApprovalRecord> {
        let approvers = self
            .approved_outcomes()?
            .into_iter()
            .map(|outcome| (outcome.stage, outcome.reviewer))
            .collect();

        Ok(ApprovalRecord {
            schema_id: submission.schema_id.clone(),
            approved_version: submission.version,
            attempts: self.state.attempts(),
            approvers,
            completed_at: self.clock.now(),
            history: self.state.iterations().to_vec(),
            summary,
        })
    }

    fn approved(&mut self, record: &ApprovalRecord) {
        log::info!(
            "Schema {} approved at version {} after {} attempts",
            record.schema_id,
            record.approved_version,
            record.attempts
        );
        let now = self.clock.now();
        self.state.push(
            HistoryEvent::Approved {
                version: record.approved_version,
                attempts: record.attempts,
            },
            now,
        );
    }

    fn not_approved(&mut self) -> ApprovalError {
        let iterations = self.state.attempts();
        let now = self.clock.now();
        self.state.push(HistoryEvent::NotApproved { iterations }, now);
        ApprovalError::NotApproved { iterations }
    }

    fn finish(&mut self, result: &Result<ApprovalRecord>) {
        let phase = match result {
            Ok(_) => WorkflowPhase::Completed,
            Err(e) => {
                log::error!("Workflow {} ended: {}", self.state.workflow_id(), e);
                match e.kind() {
                    ErrorKind::PlanExhausted => WorkflowPhase::Exhausted,
                    ErrorKind::Cancelled => WorkflowPhase::Cancelled,
                    _ => WorkflowPhase::Failed,
                }
            }
        };
        self.state.leave_round();
        self.state.set_phase(phase);
        self.publish();
    }

    fn publish(&self) {
        self.status.send_replace(StatusProjector::project(&self.state));
    }
}

/// Race `call` against cancellation of the workflow
async fn guarded<T, F>(cancel: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApprovalError::Cancelled),
        result = call => result,
    }
}
