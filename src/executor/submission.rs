use crate::error::{ExecutionError, ForgeError, LedgerError, Result};
use crate::ledger::{Ledger, TxIntent, TxReceipt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 60_000;

/// How long to wait for inclusion of one submitted transaction.
///
/// `extra_waits` re-awaits the *same* transaction for additional windows. Nothing is ever
/// resubmitted, so a late inclusion can never be doubled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub extra_waits: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_CONFIRMATION_TIMEOUT_MS),
            extra_waits: 0,
        }
    }
}

impl ConfirmationPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            extra_waits: 0,
        }
    }

    pub fn with_extra_waits(mut self, extra_waits: u32) -> Self {
        self.extra_waits = extra_waits;
        self
    }

    fn windows(&self) -> u32 {
        self.extra_waits.saturating_add(1)
    }
}

/// Shared abort flag. Consulted before every transaction a step submits; an in-flight
/// transaction is still awaited to its receipt.
#[derive(Debug, Clone, Default)]
pub struct PlanAbort(Arc<AtomicBool>);

impl PlanAbort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Submits one transaction on behalf of a plan step and waits for its receipt.
pub struct Submitter<'a> {
    ledger: &'a dyn Ledger,
    policy: &'a ConfirmationPolicy,
    step: usize,
    abort: Option<&'a PlanAbort>,
}

impl<'a> Submitter<'a> {
    pub fn new(ledger: &'a dyn Ledger, policy: &'a ConfirmationPolicy, step: usize) -> Self {
        Self {
            ledger,
            policy,
            step,
            abort: None,
        }
    }

    pub fn with_abort(mut self, abort: &'a PlanAbort) -> Self {
        self.abort = Some(abort);
        self
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub async fn submit_and_confirm(&self, intent: TxIntent) -> Result<TxReceipt> {
        let step = self.step;
        if self.abort.is_some_and(PlanAbort::is_aborted) {
            tracing::warn!(step, to = ?intent.to, "abort requested; transaction not submitted");
            return Err(ExecutionError::Aborted { step }.into());
        }
        let to = intent.to;
        let pending = self.ledger.submit(intent).await.map_err(|err| match err {
            LedgerError::Reverted(reason) => {
                ForgeError::from(ExecutionError::TransactionReverted { step, reason })
            }
            other => ForgeError::from(other),
        })?;
        tracing::info!(step, tx_hash = %pending.hash, to = ?to, "submitted");

        let started = Instant::now();
        for window in 0..self.policy.windows() {
            match tokio::time::timeout(self.policy.timeout, self.ledger.wait_for_receipt(&pending))
                .await
            {
                Ok(Ok(receipt)) if receipt.success => {
                    tracing::info!(
                        step,
                        tx_hash = %receipt.hash,
                        block = ?receipt.block_number,
                        "confirmed"
                    );
                    return Ok(receipt);
                }
                Ok(Ok(receipt)) => {
                    tracing::warn!(
                        step,
                        tx_hash = %receipt.hash,
                        reason = receipt.revert_reason.as_deref().unwrap_or("<none>"),
                        "reverted"
                    );
                    return Err(ExecutionError::TransactionReverted {
                        step,
                        reason: receipt.revert_reason,
                    }
                    .into());
                }
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => {
                    tracing::warn!(
                        step,
                        tx_hash = %pending.hash,
                        window = window + 1,
                        windows = self.policy.windows(),
                        "confirmation window elapsed"
                    );
                }
            }
        }

        Err(ExecutionError::ConfirmationTimeout {
            step,
            waited_ms: started.elapsed().as_millis() as u64,
            tx_hash: format!("{:#x}", pending.hash),
        }
        .into())
    }
}
