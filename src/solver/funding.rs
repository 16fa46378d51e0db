//! Funding step that credits the target even when its receive path always reverts.
//!
//! The value is routed through a helper that self-terminates toward the target. That credit
//! happens at the ledger level, so the target never gets a chance to reject it.

use crate::error::ConfigError;
use crate::solver::plan::{Condition, Step, StepAction};
use alloy::primitives::{Address, U256};

/// 20% on top of the verifier minimum.
pub const DEFAULT_FUNDING_MARGIN_BPS: u64 = 2_000;
const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct ForcedFundingPlanner {
    margin_bps: u64,
}

impl Default for ForcedFundingPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_FUNDING_MARGIN_BPS)
    }
}

impl ForcedFundingPlanner {
    pub fn new(margin_bps: u64) -> Self {
        Self { margin_bps }
    }

    /// Smallest funded amount this planner emits for `minimum`. Always strictly greater,
    /// because the verifier compares with `>`.
    pub fn funding_value(&self, minimum: U256) -> Result<U256, ConfigError> {
        let margin = minimum.saturating_mul(U256::from(self.margin_bps))
            / U256::from(BPS_DENOMINATOR);
        let margin = margin.max(U256::from(1u64));
        minimum.checked_add(margin).ok_or_else(|| {
            ConfigError::InvalidConfig(format!(
                "minimum balance {minimum} leaves no room for a strictly greater funding value"
            ))
        })
    }

    pub fn build_funding_step(&self, target: Address, minimum: U256) -> Result<Step, ConfigError> {
        let value = self.funding_value(minimum)?;
        Ok(Step {
            label: format!("force-fund target with {value} wei"),
            target,
            action: StepAction::ForceFund { value },
            preconditions: Vec::new(),
            postconditions: vec![Condition::BalanceIncreasedBy { amount: value }],
        })
    }
}
