//! Forced-funding capability.
//!
//! A [`ValueForwarder`] delivers value to an address without going through that address's
//! receive logic. The EVM implementation deploys a tiny helper and calls it with the value;
//! the helper immediately self-destructs toward the destination.

use crate::error::{LedgerError, Result};
use crate::executor::submission::Submitter;
use crate::ledger::TxIntent;
use crate::solver::abi;
use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::Serialize;

/// `PUSH1 4 CALLDATALOAD SELFDESTRUCT`: destination is the first ABI word after the selector.
pub const FORWARDER_RUNTIME_CODE: [u8; 4] = [0x60, 0x04, 0x35, 0xff];

/// Copies the four runtime bytes at offset 0x0b into memory and returns them.
pub const FORWARDER_INIT_CODE: [u8; 15] = [
    0x60, 0x04, // PUSH1 runtime length
    0x80, // DUP1
    0x60, 0x0b, // PUSH1 runtime offset
    0x60, 0x00, // PUSH1 0
    0x39, // CODECOPY
    0x60, 0x00, // PUSH1 0
    0xf3, // RETURN
    0x60, 0x04, 0x35, 0xff,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardReceipt {
    pub helper: Address,
    pub deploy_tx: B256,
    pub forward_tx: B256,
    pub value: U256,
}

#[async_trait]
pub trait ValueForwarder: Send + Sync {
    fn name(&self) -> &'static str;

    async fn forward(
        &self,
        submitter: &Submitter<'_>,
        destination: Address,
        value: U256,
    ) -> Result<ForwardReceipt>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelfDestructForwarder;

#[async_trait]
impl ValueForwarder for SelfDestructForwarder {
    fn name(&self) -> &'static str {
        "selfdestruct-helper"
    }

    async fn forward(
        &self,
        submitter: &Submitter<'_>,
        destination: Address,
        value: U256,
    ) -> Result<ForwardReceipt> {
        let deploy = submitter
            .submit_and_confirm(TxIntent::deploy(Bytes::from_static(&FORWARDER_INIT_CODE)))
            .await?;
        let helper = deploy
            .contract_address
            .ok_or_else(|| LedgerError::MissingContractAddress(format!("{:#x}", deploy.hash)))?;
        tracing::info!(
            step = submitter.step(),
            %helper,
            %destination,
            %value,
            "forwarder deployed"
        );

        let forward = submitter
            .submit_and_confirm(TxIntent::call(
                helper,
                abi::forward_calldata(destination),
                value,
            ))
            .await?;

        Ok(ForwardReceipt {
            helper,
            deploy_tx: deploy.hash,
            forward_tx: forward.hash,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_code_embeds_runtime_at_declared_offset() {
        let offset = FORWARDER_INIT_CODE[4] as usize;
        let len = FORWARDER_INIT_CODE[1] as usize;
        assert_eq!(offset + len, FORWARDER_INIT_CODE.len());
        assert_eq!(&FORWARDER_INIT_CODE[offset..], &FORWARDER_RUNTIME_CODE);
    }
}
