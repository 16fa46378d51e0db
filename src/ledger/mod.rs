//! Ledger access seam.
//!
//! The orchestrator only needs to submit a transaction, wait for its receipt, run a read-only
//! call and read raw storage/balances. [`rpc::RpcLedger`] speaks JSON-RPC to a live node;
//! [`simulated::SimulatedLedger`] executes the same surface in memory for tests and dry runs.

pub mod rpc;
pub mod simulated;
pub mod snapshot;

use crate::error::LedgerError;
use crate::storage::Slot;
use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

pub use snapshot::TargetSnapshot;

/// A transaction to submit. `to == None` deploys `input` as init code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIntent {
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
}

impl TxIntent {
    pub fn call(to: Address, input: Bytes, value: U256) -> Self {
        Self {
            to: Some(to),
            input,
            value,
        }
    }

    pub fn deploy(init_code: Bytes) -> Self {
        Self {
            to: None,
            input: init_code,
            value: U256::ZERO,
        }
    }
}

/// Handle of a submitted transaction. Once this exists the transaction cannot be withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub contract_address: Option<Address>,
    pub revert_reason: Option<String>,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Account that signs every submission.
    fn sender(&self) -> Address;

    async fn submit(&self, intent: TxIntent) -> Result<PendingTx, LedgerError>;

    /// Resolves once the transaction is included. Callers bound this with their own timeout.
    async fn wait_for_receipt(&self, pending: &PendingTx) -> Result<TxReceipt, LedgerError>;

    async fn read(&self, to: Address, input: Bytes) -> Result<Bytes, LedgerError>;

    async fn storage_at(&self, address: Address, slot: Slot) -> Result<U256, LedgerError>;

    async fn balance_of(&self, address: Address) -> Result<U256, LedgerError>;
}
