//! Approval workflow: ledger, gate, state machine and handles

pub mod dispatcher;
pub mod gate;
pub mod handle;
pub mod input;
pub mod ledger;
pub mod state;
pub mod state_machine;
pub mod status;
pub mod submission;

pub use dispatcher::ReviewDispatcher;
pub use gate::ResubmissionGate;
pub use handle::{spawn_live, spawn_plan, WorkflowHandle, WorkflowOptions};
pub use input::SchemaApprovalInput;
pub use ledger::{Admission, DecisionLedger};
pub use state::{Signal, WorkflowState};
pub use state_machine::ApprovalStateMachine;
pub use status::StatusProjector;
pub use submission::SubmissionBuilder;
