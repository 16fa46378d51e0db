//! JSON-RPC ledger backed by an alloy HTTP provider and a local private key.

use crate::error::LedgerError;
use crate::ledger::{Ledger, PendingTx, TxIntent, TxReceipt};
use crate::storage::Slot;
use crate::utils::error::{compact_error_message, extract_revert_reason};
use crate::utils::hex::clean_hex;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::Http;
use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Duration};

pub type HttpProvider = RootProvider<Http<Client>>;

const RPC_ERR_MAX_LEN: usize = 260;
const READ_ATTEMPTS: usize = 3;
const READ_CALL_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;

pub fn bounded_exponential_backoff_ms(base_ms: u64, streak: u32, cap_ms: u64) -> u64 {
    if base_ms == 0 {
        return 0;
    }
    let clamped = streak.min(8);
    base_ms
        .saturating_mul(1u64 << clamped)
        .min(cap_ms.max(base_ms))
}

fn is_retryable_read_error(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    let non_retryable = [
        "execution reverted",
        "revert",
        "invalid params",
        "-32602",
        "method not found",
        "-32601",
    ];
    !non_retryable.iter().any(|needle| msg.contains(needle))
}

fn classify_rpc_error(message: String) -> LedgerError {
    let message = compact_error_message(&message, RPC_ERR_MAX_LEN);
    if message.to_ascii_lowercase().contains("revert") {
        LedgerError::Reverted(extract_revert_reason(&message))
    } else {
        LedgerError::Transport(message)
    }
}

/// Bounded retry for idempotent reads. Submissions never go through here.
async fn run_read_with_retry<T, Op, Fut>(context: &str, mut op: Op) -> Result<T, LedgerError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut last_message = String::new();
    for attempt in 1..=READ_ATTEMPTS {
        match timeout(Duration::from_millis(READ_CALL_TIMEOUT_MS), op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(message)) => {
                let message = compact_error_message(&message, RPC_ERR_MAX_LEN);
                if !is_retryable_read_error(&message) {
                    return Err(classify_rpc_error(message));
                }
                last_message = message;
            }
            Err(_) => {
                last_message = format!("timed out after {READ_CALL_TIMEOUT_MS}ms");
            }
        }
        if attempt < READ_ATTEMPTS {
            tracing::debug!(context, attempt, error = %last_message, "retrying read");
            sleep(Duration::from_millis(bounded_exponential_backoff_ms(
                100,
                attempt as u32,
                1_800,
            )))
            .await;
        }
    }
    Err(LedgerError::Transport(format!(
        "{context} failed after {READ_ATTEMPTS} attempt(s): {last_message}"
    )))
}

pub struct RpcLedger {
    provider: HttpProvider,
    signer: PrivateKeySigner,
    wallet: EthereumWallet,
    chain_id: u64,
    receipt_poll: Duration,
    /// Next nonce to use. `None` forces a resync from the node.
    nonce: Mutex<Option<u64>>,
}

impl RpcLedger {
    pub fn new(provider: HttpProvider, signer: PrivateKeySigner, chain_id: u64) -> Self {
        let wallet = EthereumWallet::from(signer.clone());
        Self {
            provider,
            signer,
            wallet,
            chain_id,
            receipt_poll: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
            nonce: Mutex::new(None),
        }
    }

    pub fn with_receipt_poll(mut self, poll: Duration) -> Self {
        self.receipt_poll = poll;
        self
    }

    /// Builds the provider from `rpc_url` and detects the chain id when none is given.
    pub async fn connect(
        rpc_url: &str,
        private_key: &str,
        chain_id: Option<u64>,
    ) -> Result<Self, LedgerError> {
        let url = rpc_url
            .parse::<reqwest::Url>()
            .map_err(|err| LedgerError::Transport(format!("invalid RPC url `{rpc_url}`: {err}")))?;
        let provider = ProviderBuilder::new().on_http(url);
        let signer = clean_hex(private_key)
            .parse::<PrivateKeySigner>()
            .map_err(|err| LedgerError::Signer(err.to_string()))?;

        let chain_id = match chain_id {
            Some(id) => id,
            None => {
                let provider = &provider;
                run_read_with_retry("eth_chainId", || async move {
                    provider.get_chain_id().await.map_err(|e| e.to_string())
                })
                .await?
            }
        };
        tracing::info!(chain_id, sender = %signer.address(), "connected to ledger");
        Ok(Self::new(provider, signer, chain_id))
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn next_nonce(&self, slot: &mut Option<u64>) -> Result<u64, LedgerError> {
        if let Some(nonce) = *slot {
            return Ok(nonce);
        }
        let sender = self.signer.address();
        let provider = &self.provider;
        let nonce = run_read_with_retry("eth_getTransactionCount", || async move {
            provider
                .get_transaction_count(sender)
                .await
                .map_err(|e| e.to_string())
        })
        .await?;
        *slot = Some(nonce);
        Ok(nonce)
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    fn sender(&self) -> Address {
        self.signer.address()
    }

    async fn submit(&self, intent: TxIntent) -> Result<PendingTx, LedgerError> {
        // Held until the raw transaction is handed to the node.
        let mut nonce_slot = self.nonce.lock().await;
        let nonce = self.next_nonce(&mut nonce_slot).await?;

        let mut tx = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_value(intent.value)
            .with_chain_id(self.chain_id)
            .with_nonce(nonce);
        tx = match intent.to {
            Some(to) => tx.with_to(to).with_input(intent.input),
            None => tx.with_deploy_code(intent.input),
        };

        let gas = self
            .provider
            .estimate_gas(&tx)
            .await
            .map_err(|err| classify_rpc_error(err.to_string()))?;
        let fees = self
            .provider
            .estimate_eip1559_fees(None)
            .await
            .map_err(|err| classify_rpc_error(err.to_string()))?;
        let tx = tx
            .with_gas_limit(gas + gas / 5)
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|err| LedgerError::Signer(compact_error_message(&err.to_string(), 200)))?;
        let raw = envelope.encoded_2718();

        match self.provider.send_raw_transaction(&raw).await {
            Ok(pending) => {
                *nonce_slot = Some(nonce.saturating_add(1));
                Ok(PendingTx {
                    hash: *pending.tx_hash(),
                })
            }
            Err(err) => {
                *nonce_slot = None;
                Err(classify_rpc_error(err.to_string()))
            }
        }
    }

    async fn wait_for_receipt(&self, pending: &PendingTx) -> Result<TxReceipt, LedgerError> {
        loop {
            match self.provider.get_transaction_receipt(pending.hash).await {
                Ok(Some(receipt)) => {
                    let success = receipt.status();
                    return Ok(TxReceipt {
                        hash: receipt.transaction_hash,
                        success,
                        block_number: receipt.block_number,
                        contract_address: receipt.contract_address,
                        revert_reason: None,
                    });
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(
                        tx_hash = %pending.hash,
                        error = %compact_error_message(&err.to_string(), RPC_ERR_MAX_LEN),
                        "receipt poll failed"
                    );
                }
            }
            sleep(self.receipt_poll).await;
        }
    }

    async fn read(&self, to: Address, input: Bytes) -> Result<Bytes, LedgerError> {
        let tx = TransactionRequest::default().with_to(to).with_input(input);
        let (provider, tx) = (&self.provider, &tx);
        run_read_with_retry("eth_call", || async move {
            provider.call(tx).await.map_err(|e| e.to_string())
        })
        .await
    }

    async fn storage_at(&self, address: Address, slot: Slot) -> Result<U256, LedgerError> {
        let provider = &self.provider;
        run_read_with_retry("eth_getStorageAt", || async move {
            provider
                .get_storage_at(address, slot.as_u256())
                .await
                .map_err(|e| e.to_string())
        })
        .await
    }

    async fn balance_of(&self, address: Address) -> Result<U256, LedgerError> {
        let provider = &self.provider;
        run_read_with_retry("eth_getBalance", || async move {
            provider
                .get_balance(address)
                .await
                .map_err(|e| e.to_string())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_bounded() {
        assert_eq!(bounded_exponential_backoff_ms(100, 0, 1_800), 100);
        assert_eq!(bounded_exponential_backoff_ms(100, 3, 1_800), 800);
        assert_eq!(bounded_exponential_backoff_ms(100, 30, 1_800), 1_800);
        assert_eq!(bounded_exponential_backoff_ms(0, 5, 1_800), 0);
    }

    #[test]
    fn test_reverts_are_not_retried_and_keep_reason() {
        assert!(!is_retryable_read_error("execution reverted: nope"));
        assert!(is_retryable_read_error("connection reset by peer"));
        assert_eq!(
            classify_rpc_error("error code 3: execution reverted: index out of bounds".into()),
            LedgerError::Reverted(Some("index out of bounds".to_string()))
        );
        assert!(matches!(
            classify_rpc_error("503 Service Unavailable".into()),
            LedgerError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_read_retry_gives_up_after_bounded_attempts() {
        let mut calls = 0usize;
        let result: Result<u64, LedgerError> = run_read_with_retry("probe", || {
            calls += 1;
            async { Err("connection reset".to_string()) }
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Transport(_))));
        assert_eq!(calls, READ_ATTEMPTS);
    }
}
