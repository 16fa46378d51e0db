use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::solver::abi::{self, ITargetRegistry};
use crate::storage::Slot;
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;

/// Point-in-time view of the target, always fetched fresh before a decision that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSnapshot {
    pub owner_address: Address,
    pub flag_captured: bool,
    pub balance_wei: U256,
    /// Raw length word of the exploited array, when the caller asked for it.
    pub array_length: Option<U256>,
}

impl TargetSnapshot {
    pub async fn fetch(
        ledger: &dyn Ledger,
        target: Address,
        length_slot: Option<Slot>,
    ) -> Result<Self, LedgerError> {
        let owner_raw = ledger.read(target, abi::owner_calldata()).await?;
        let owner_address = ITargetRegistry::ownerCall::abi_decode_returns(&owner_raw, true)
            .map_err(|err| LedgerError::Decode {
                method: "owner()".to_string(),
                reason: err.to_string(),
            })?
            .account;

        let flag_raw = ledger.read(target, abi::flag_captured_calldata()).await?;
        let flag_captured = ITargetRegistry::flagCapturedCall::abi_decode_returns(&flag_raw, true)
            .map_err(|err| LedgerError::Decode {
                method: "flagCaptured()".to_string(),
                reason: err.to_string(),
            })?
            .captured;

        let balance_wei = ledger.balance_of(target).await?;
        let array_length = match length_slot {
            Some(slot) => Some(ledger.storage_at(target, slot).await?),
            None => None,
        };

        Ok(Self {
            owner_address,
            flag_captured,
            balance_wei,
            array_length,
        })
    }
}
