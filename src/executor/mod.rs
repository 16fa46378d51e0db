//! Plan execution: state machine, submission policy, forced funding and verification.

pub mod campaign;
pub mod forwarder;
pub mod orchestrator;
pub mod state_machine;
pub mod submission;
pub mod verifier;

pub use campaign::{run_campaign, CampaignEntry, CampaignResult};
pub use forwarder::{SelfDestructForwarder, ValueForwarder};
pub use orchestrator::{ExecutionReport, Orchestrator, SessionIdentity};
pub use state_machine::{FailureCause, PlanState, PlanStateMachine, StepEvent};
pub use submission::{ConfirmationPolicy, PlanAbort};
pub use verifier::{
    HttpVerificationClient, LedgerVerifier, Predicate, VerificationClient, VerificationOutcome,
    VerificationRequest,
};
