//! Drives an [`ExploitPlan`] against a ledger, one step at a time.
//!
//! Each step is gated on a fresh snapshot: preconditions are checked immediately before
//! submission and postconditions immediately after confirmation. A step is submitted only
//! once its predecessor is confirmed, so at most one transaction of a plan is in flight.
//! After the last step the orchestrator captures the flag and asks the verifier for a verdict.

use crate::error::{ExecutionError, ForgeError, Result, VerifyError};
use crate::executor::forwarder::ValueForwarder;
use crate::executor::state_machine::{
    FailureCause, PlanState, PlanStateMachine, StepEvent, Transition,
};
use crate::executor::submission::{ConfirmationPolicy, PlanAbort, Submitter};
use crate::executor::verifier::{
    unmet_predicates, VerificationClient, VerificationOutcome, VerificationRequest,
};
use crate::ledger::{Ledger, TargetSnapshot, TxIntent};
use crate::solver::abi;
use crate::solver::plan::{ExploitPlan, Step};
use alloy::primitives::{Address, B256, U256};
use serde::Serialize;
use std::sync::Arc;

/// Who the verifier should credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_address: Address,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub index: usize,
    pub label: String,
    pub kind: &'static str,
    pub tx_hashes: Vec<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub target: Address,
    pub final_state: PlanState,
    pub transitions: Vec<Transition>,
    pub steps: Vec<StepRecord>,
    pub capture_tx: Option<B256>,
    pub verification: Option<VerificationOutcome>,
}

fn failure_cause(err: &ForgeError) -> FailureCause {
    match err {
        ForgeError::Execution(ExecutionError::TransactionReverted { reason, .. }) => {
            FailureCause::Reverted {
                reason: reason.clone(),
            }
        }
        ForgeError::Execution(ExecutionError::ConfirmationTimeout { waited_ms, .. }) => {
            FailureCause::Timeout {
                waited_ms: *waited_ms,
            }
        }
        ForgeError::Execution(ExecutionError::Aborted { .. }) => FailureCause::Aborted,
        other => FailureCause::Ledger {
            message: other.to_string(),
        },
    }
}

type StepFailure = (FailureCause, ForgeError);

/// Moves the machine to `Failed` and hands back the error that stopped the plan.
fn halt(
    machine: &mut PlanStateMachine,
    plan: &ExploitPlan,
    step: &Step,
    (cause, err): StepFailure,
) -> ForgeError {
    let index = match machine.state() {
        PlanState::Pending(i) | PlanState::Confirmed(i) => *i,
        _ => plan.steps.len(),
    };
    if let Err(transition) = machine.apply(StepEvent::Failed(cause)) {
        return transition.into();
    }
    tracing::error!(
        step = index,
        action = step.kind(),
        target = %plan.target,
        state = %machine.state(),
        error = %err,
        "plan halted"
    );
    err
}

pub struct Orchestrator {
    ledger: Arc<dyn Ledger>,
    forwarder: Arc<dyn ValueForwarder>,
    verifier: Arc<dyn VerificationClient>,
    policy: ConfirmationPolicy,
    abort: PlanAbort,
}

impl Orchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        forwarder: Arc<dyn ValueForwarder>,
        verifier: Arc<dyn VerificationClient>,
    ) -> Self {
        Self {
            ledger,
            forwarder,
            verifier,
            policy: ConfirmationPolicy::default(),
            abort: PlanAbort::new(),
        }
    }

    pub fn with_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_abort(mut self, abort: PlanAbort) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_handle(&self) -> PlanAbort {
        self.abort.clone()
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    async fn snapshot(&self, plan: &ExploitPlan) -> Result<TargetSnapshot> {
        Ok(TargetSnapshot::fetch(self.ledger.as_ref(), plan.target, Some(plan.length_slot)).await?)
    }

    /// Runs every step to `Complete` without capturing or verifying.
    pub async fn run_steps(&self, plan: &ExploitPlan) -> Result<ExecutionReport> {
        let mut machine = PlanStateMachine::new(plan.steps.len());
        let mut records = Vec::with_capacity(plan.steps.len());

        loop {
            let PlanState::Pending(index) = *machine.state() else {
                break;
            };
            let step = &plan.steps[index];
            let (tx_hashes, baseline) = match self.dispatch_step(plan, index, step).await {
                Ok(dispatched) => dispatched,
                Err(failure) => return Err(halt(&mut machine, plan, step, failure)),
            };
            machine.apply(StepEvent::Included)?;
            records.push(StepRecord {
                index,
                label: step.label.clone(),
                kind: step.kind(),
                tx_hashes,
            });
            if let Err(failure) = self.check_postconditions(plan, index, step, &baseline).await {
                return Err(halt(&mut machine, plan, step, failure));
            }
            machine.apply(StepEvent::Advance)?;
        }

        Ok(ExecutionReport {
            target: plan.target,
            final_state: machine.state().clone(),
            transitions: machine.history().to_vec(),
            steps: records,
            capture_tx: None,
            verification: None,
        })
    }

    fn aborted(&self, index: usize) -> std::result::Result<(), StepFailure> {
        if self.abort.is_aborted() {
            return Err((
                FailureCause::Aborted,
                ExecutionError::Aborted { step: index }.into(),
            ));
        }
        Ok(())
    }

    /// Gates `step` on its preconditions and submits it. Returns the confirmed transaction
    /// hashes with the snapshot the preconditions were judged against.
    async fn dispatch_step(
        &self,
        plan: &ExploitPlan,
        index: usize,
        step: &Step,
    ) -> std::result::Result<(Vec<B256>, TargetSnapshot), StepFailure> {
        self.aborted(index)?;
        let baseline = self
            .snapshot(plan)
            .await
            .map_err(|err| (failure_cause(&err), err))?;
        if let Some(unmet) = step
            .preconditions
            .iter()
            .find(|condition| !condition.holds(&baseline, &baseline))
        {
            let predicate = unmet.describe();
            return Err((
                FailureCause::PreconditionUnmet {
                    predicate: predicate.clone(),
                },
                ExecutionError::PreconditionUnmet {
                    step: index,
                    predicate,
                }
                .into(),
            ));
        }
        // The snapshot read can take a while on a live node.
        self.aborted(index)?;

        tracing::info!(
            step = index,
            action = step.kind(),
            target = %plan.target,
            label = %step.label,
            "executing step"
        );
        let submitter =
            Submitter::new(self.ledger.as_ref(), &self.policy, index).with_abort(&self.abort);
        let dispatched = match step.call_intent() {
            Some(intent) => submitter
                .submit_and_confirm(intent)
                .await
                .map(|receipt| vec![receipt.hash]),
            None => self
                .forwarder
                .forward(&submitter, step.target, step.value())
                .await
                .map(|receipt| vec![receipt.deploy_tx, receipt.forward_tx]),
        };
        let tx_hashes = dispatched.map_err(|err| (failure_cause(&err), err))?;
        Ok((tx_hashes, baseline))
    }

    async fn check_postconditions(
        &self,
        plan: &ExploitPlan,
        index: usize,
        step: &Step,
        baseline: &TargetSnapshot,
    ) -> std::result::Result<(), StepFailure> {
        let current = self.snapshot(plan).await.map_err(|err| {
            (
                FailureCause::Ledger {
                    message: err.to_string(),
                },
                err,
            )
        })?;
        if let Some(unmet) = step
            .postconditions
            .iter()
            .find(|condition| !condition.holds(baseline, &current))
        {
            let predicate = unmet.describe();
            return Err((
                FailureCause::PostconditionUnmet {
                    predicate: predicate.clone(),
                },
                ExecutionError::PostconditionUnmet {
                    step: index,
                    predicate,
                }
                .into(),
            ));
        }
        Ok(())
    }

    /// Runs the plan, captures the flag as the new owner and verifies the result.
    pub async fn execute(
        &self,
        plan: &ExploitPlan,
        identity: &SessionIdentity,
    ) -> Result<ExecutionReport> {
        let mut report = self.run_steps(plan).await?;

        let capture_step = plan.steps.len();
        if self.abort.is_aborted() {
            return Err(ExecutionError::Aborted { step: capture_step }.into());
        }
        let submitter = Submitter::new(self.ledger.as_ref(), &self.policy, capture_step)
            .with_abort(&self.abort);
        let capture = submitter
            .submit_and_confirm(TxIntent::call(
                plan.target,
                abi::capture_calldata(),
                U256::ZERO,
            ))
            .await?;
        tracing::info!(target = %plan.target, tx_hash = %capture.hash, "flag captured");
        report.capture_tx = Some(capture.hash);

        let request = VerificationRequest {
            user_address: identity.user_address,
            contract_address: plan.target,
            user_id: identity.user_id.clone(),
        };
        let outcome = match self.verifier.verify(&request).await? {
            VerificationOutcome::Failed { unmet } if unmet.is_empty() => {
                // Verifier gave no detail; report what the ledger shows.
                let snapshot = self.snapshot(plan).await?;
                VerificationOutcome::Failed {
                    unmet: unmet_predicates(
                        &snapshot,
                        identity.user_address,
                        plan.minimum_balance,
                    ),
                }
            }
            outcome => outcome,
        };

        match outcome {
            VerificationOutcome::Passed { .. } => {
                tracing::info!(
                    target = %plan.target,
                    user = %identity.user_address,
                    "verification passed"
                );
                report.verification = Some(outcome);
                Ok(report)
            }
            VerificationOutcome::Failed { unmet } => {
                tracing::warn!(
                    target = %plan.target,
                    unmet = ?unmet.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
                    "verification failed"
                );
                Err(VerifyError::VerificationFailed { unmet }.into())
            }
        }
    }
}
