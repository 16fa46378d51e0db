//! Explicit transition table for plan execution.
//!
//! ```text
//! Pending(i)   --Included-->        Confirmed(i)
//! Pending(i)   --Failed(cause)-->   Failed(i, cause)
//! Confirmed(i) --Failed(post)-->    Failed(i, post)   post: postcondition unmet or unreadable
//! Confirmed(i) --Advance-->         Pending(i + 1) | Complete (after the last step)
//! Failed, Complete                  terminal
//! ```

use crate::error::ExecutionError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "camelCase")]
pub enum FailureCause {
    PreconditionUnmet { predicate: String },
    PostconditionUnmet { predicate: String },
    Reverted { reason: Option<String> },
    #[serde(rename_all = "camelCase")]
    Timeout { waited_ms: u64 },
    Aborted,
    Ledger { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "camelCase")]
pub enum PlanState {
    Pending(usize),
    Confirmed(usize),
    Failed(usize, FailureCause),
    Complete,
}

impl FailureCause {
    /// Causes that can only be observed after the step's transaction is included.
    pub fn follows_inclusion(&self) -> bool {
        matches!(self, Self::PostconditionUnmet { .. } | Self::Ledger { .. })
    }
}

impl PlanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(..) | Self::Complete)
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(i) => write!(f, "Pending({i})"),
            Self::Confirmed(i) => write!(f, "Confirmed({i})"),
            Self::Failed(i, cause) => write!(f, "Failed({i}, {cause:?})"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    Included,
    Failed(FailureCause),
    Advance,
}

impl fmt::Display for StepEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Included => write!(f, "Included"),
            Self::Failed(cause) => write!(f, "Failed({cause:?})"),
            Self::Advance => write!(f, "Advance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: PlanState,
    pub to: PlanState,
}

/// The whole table. `None` marks an illegal transition.
pub fn next_state(state: &PlanState, event: &StepEvent, step_count: usize) -> Option<PlanState> {
    match (state, event) {
        (PlanState::Pending(i), StepEvent::Included) => Some(PlanState::Confirmed(*i)),
        (PlanState::Pending(i), StepEvent::Failed(cause)) => {
            Some(PlanState::Failed(*i, cause.clone()))
        }
        (PlanState::Confirmed(i), StepEvent::Failed(cause)) if cause.follows_inclusion() => {
            Some(PlanState::Failed(*i, cause.clone()))
        }
        (PlanState::Confirmed(i), StepEvent::Advance) => {
            let next = i + 1;
            if next < step_count {
                Some(PlanState::Pending(next))
            } else {
                Some(PlanState::Complete)
            }
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct PlanStateMachine {
    step_count: usize,
    state: PlanState,
    history: Vec<Transition>,
}

impl PlanStateMachine {
    pub fn new(step_count: usize) -> Self {
        let state = if step_count == 0 {
            PlanState::Complete
        } else {
            PlanState::Pending(0)
        };
        Self {
            step_count,
            state,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> &PlanState {
        &self.state
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    pub fn apply(&mut self, event: StepEvent) -> Result<&PlanState, ExecutionError> {
        let Some(next) = next_state(&self.state, &event, self.step_count) else {
            return Err(ExecutionError::InvalidTransition {
                from: self.state.to_string(),
                event: event.to_string(),
            });
        };
        tracing::debug!(from = %self.state, to = %next, "plan transition");
        self.history.push(Transition {
            from: self.state.clone(),
            to: next.clone(),
        });
        self.state = next;
        Ok(&self.state)
    }
}
