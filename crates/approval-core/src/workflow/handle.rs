//! Caller-facing handle of a running workflow

use super::input::SchemaApprovalInput;
use super::state::Signal;
use super::state_machine::ApprovalStateMachine;
use crate::activities::ApprovalActivities;
use crate::clock::{Clock, SystemClock};
use crate::config::ApprovalConfig;
use crate::error::{ApprovalError, Result};
use crate::retry::RetryPolicy;
use approval_types::{ApprovalRecord, ReviewDecision, SchemaApprovalPlan, StatusSnapshot, Submission};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Runtime settings of a single workflow
#[derive(Clone)]
pub struct WorkflowOptions {
    pub workflow_id: Option<String>,
    pub retry: RetryPolicy,
    pub max_live_iterations: Option<u32>,
    pub clock: Arc<dyn Clock>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            workflow_id: None,
            retry: RetryPolicy::default(),
            max_live_iterations: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl From<&ApprovalConfig> for WorkflowOptions {
    fn from(config: &ApprovalConfig) -> Self {
        Self {
            retry: RetryPolicy::from(&config.retry),
            max_live_iterations: config.max_live_iterations,
            ..Self::default()
        }
    }
}

impl WorkflowOptions {
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_live_iterations(mut self, limit: u32) -> Self {
        self.max_live_iterations = Some(limit);
        self
    }
}

/// Cloneable handle for signalling and observing a workflow.
///
/// Signals are fire-and-forget: they are queued and applied when the
/// workflow next waits for input. Status reads never block.
#[derive(Clone)]
pub struct WorkflowHandle {
    workflow_id: String,
    signals: mpsc::UnboundedSender<Signal>,
    status: watch::Receiver<StatusSnapshot>,
    cancel: CancellationToken,
}

impl WorkflowHandle {
    pub(crate) fn new(
        workflow_id: String,
        signals: mpsc::UnboundedSender<Signal>,
        status: watch::Receiver<StatusSnapshot>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            workflow_id,
            signals,
            status,
            cancel,
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Offer a new schema revision
    pub fn submit(&self, submission: Submission) -> Result<()> {
        self.send(Signal::Submit(submission))
    }

    /// Deliver a reviewer's decision.
    ///
    /// A follow-up waiver on any stage other than Review2 is refused here
    /// and never reaches the workflow.
    pub fn record_decision(&self, decision: ReviewDecision) -> Result<()> {
        decision.validate()?;
        self.send(Signal::Decision(decision))
    }

    /// Latest published status
    pub fn status(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }

    pub fn cancel(&self) {
        log::info!("Cancelling workflow {}", self.workflow_id);
        self.cancel.cancel();
    }

    /// Wait until the published status satisfies `predicate`.
    ///
    /// Fails with `WorkflowClosed` if the workflow ends without ever
    /// publishing a matching status.
    pub async fn wait_until<F>(&self, predicate: F) -> Result<StatusSnapshot>
    where
        F: Fn(&StatusSnapshot) -> bool,
    {
        let mut status = self.status.clone();
        loop {
            {
                let current = status.borrow_and_update();
                if predicate(&current) {
                    return Ok(current.clone());
                }
            }
            if status.changed().await.is_err() {
                let last = status.borrow();
                return if predicate(&last) {
                    Ok(last.clone())
                } else {
                    Err(ApprovalError::WorkflowClosed)
                };
            }
        }
    }

    fn send(&self, signal: Signal) -> Result<()> {
        self.signals
            .send(signal)
            .map_err(|_| ApprovalError::WorkflowClosed)
    }
}

/// Start a workflow whose decisions arrive through the returned handle
pub fn spawn_live<A>(
    activities: Arc<A>,
    input: SchemaApprovalInput,
    options: WorkflowOptions,
) -> (WorkflowHandle, JoinHandle<Result<ApprovalRecord>>)
where
    A: ApprovalActivities + 'static,
{
    let (machine, handle) = ApprovalStateMachine::new(activities, options);
    let task = tokio::spawn(machine.run_live(input));
    (handle, task)
}

/// Start a workflow driven by a pre-defined plan
pub fn spawn_plan<A>(
    activities: Arc<A>,
    plan: SchemaApprovalPlan,
    options: WorkflowOptions,
) -> (WorkflowHandle, JoinHandle<Result<ApprovalRecord>>)
where
    A: ApprovalActivities + 'static,
{
    let (machine, handle) = ApprovalStateMachine::new(activities, options);
    let task = tokio::spawn(machine.run_plan(plan));
    (handle, task)
}
