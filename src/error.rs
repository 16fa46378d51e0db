use crate::executor::verifier::Predicate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForgeError>;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("verification error: {0}")]
    Verify(#[from] VerifyError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("variable `{0}` is not a dynamic array")]
    NotDynamicArray(String),
    #[error("variable `{0}` is declared more than once")]
    DuplicateVariable(String),
    #[error("unsupported solidity type `{0}`")]
    UnsupportedType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("transaction rejected before inclusion: {}", .0.as_deref().unwrap_or("<no reason>"))]
    Reverted(Option<String>),
    #[error("failed to decode `{method}` response: {reason}")]
    Decode { method: String, reason: String },
    #[error("deployment receipt {0} carries no contract address")]
    MissingContractAddress(String),
    #[error("signer failure: {0}")]
    Signer(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("step {step} precondition unmet: {predicate}")]
    PreconditionUnmet { step: usize, predicate: String },
    #[error("step {step} postcondition unmet: {predicate}")]
    PostconditionUnmet { step: usize, predicate: String },
    #[error("step {step} reverted: {}", .reason.as_deref().unwrap_or("<no reason>"))]
    TransactionReverted { step: usize, reason: Option<String> },
    #[error("step {step} not confirmed after {waited_ms}ms (tx {tx_hash})")]
    ConfirmationTimeout {
        step: usize,
        waited_ms: u64,
        tx_hash: String,
    },
    #[error("plan aborted before step {step} was submitted")]
    Aborted { step: usize },
    #[error("invalid plan transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },
    #[error("execution task for target {target} did not complete")]
    TaskFailed { target: String },
}

impl ExecutionError {
    pub fn step(&self) -> Option<usize> {
        match self {
            Self::PreconditionUnmet { step, .. }
            | Self::PostconditionUnmet { step, .. }
            | Self::TransactionReverted { step, .. }
            | Self::ConfirmationTimeout { step, .. }
            | Self::Aborted { step } => Some(*step),
            Self::InvalidTransition { .. } | Self::TaskFailed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("verification failed; unmet predicates: {}", render_predicates(.unmet))]
    VerificationFailed { unmet: Vec<Predicate> },
    #[error("verifier transport failure: {0}")]
    Transport(String),
    #[error("malformed verifier response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingConfig(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn render_predicates(unmet: &[Predicate]) -> String {
    if unmet.is_empty() {
        return "<unspecified>".to_string();
    }
    unmet
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
