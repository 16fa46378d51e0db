//! In-memory ledger that executes the target registry and the funding helper.
//!
//! State changes are applied at submission and a receipt is recorded immediately; an optional
//! inclusion delay holds receipts back so confirmation timeouts can be exercised. A reverted
//! transaction leaves every account untouched but still consumes the sender's nonce.
//! Element writes follow the registry's [`TitleEncoding`]; native string elements get the
//! compiler's byte-array storage, including the `0x22` panic on a malformed previous value.

use crate::error::{LayoutError, LedgerError};
use crate::executor::forwarder::FORWARDER_INIT_CODE;
use crate::ledger::{Ledger, PendingTx, TxIntent, TxReceipt};
use crate::solver::abi::{decode_edit_entry, selector_of, ITargetRegistry};
use crate::storage::encoding::{
    bytes32_word, short_string_word, string_data_slot_count, string_storage_length,
    string_storage_writes,
};
use crate::storage::layout::names;
use crate::storage::{derive_dynamic_array_base_slot, Slot, StorageLayout, TitleEncoding};
use alloy::primitives::{address, keccak256, Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Old string data slots one write can clear before running out of gas.
const MAX_CLEARED_SLOTS: u64 = 1_024;

/// Behaviour of a deployed registry: which declarations play which role.
#[derive(Debug, Clone)]
pub struct RegistryModel {
    pub layout: StorageLayout,
    pub array: String,
    pub owner: String,
    pub flag: String,
    /// Plain value transfers revert, as a contract without a usable receive path would.
    pub rejects_value: bool,
    pub title_encoding: TitleEncoding,
}

impl RegistryModel {
    pub fn default_target(rejects_value: bool) -> Self {
        Self {
            layout: StorageLayout::default_target(),
            array: names::ENTRIES.to_string(),
            owner: names::OWNER.to_string(),
            flag: names::FLAG_CAPTURED.to_string(),
            rejects_value,
            title_encoding: TitleEncoding::default(),
        }
    }

    pub fn with_title_encoding(mut self, title_encoding: TitleEncoding) -> Self {
        self.title_encoding = title_encoding;
        self
    }

    fn store_title(
        &self,
        storage: &mut HashMap<U256, U256>,
        element: Slot,
        title: &[u8],
    ) -> Result<(), String> {
        match self.title_encoding {
            TitleEncoding::Bytes32Word => {
                storage.insert(element.as_u256(), bytes32_word(title));
            }
            TitleEncoding::SolidityString => {
                let old = storage.get(&element.as_u256()).copied().unwrap_or_default();
                let old_len = string_storage_length(old)
                    .ok_or_else(|| "Panic(0x22): invalid storage byte array encoding".to_string())?;
                // Clearing the previous value's data costs gas per slot.
                let stale = u64::try_from(string_data_slot_count(old_len))
                    .ok()
                    .filter(|count| *count <= MAX_CLEARED_SLOTS)
                    .ok_or_else(|| "out of gas".to_string())?;
                let data = derive_dynamic_array_base_slot(element);
                for k in 0..stale {
                    storage.remove(&data.offset(k).as_u256());
                }
                for (slot, word) in string_storage_writes(element, title) {
                    storage.insert(slot.as_u256(), word);
                }
            }
        }
        Ok(())
    }

    fn read_owner(&self, storage: &HashMap<U256, U256>) -> Result<Address, LayoutError> {
        let pos = self.layout.slot_position(&self.owner)?;
        let word = storage.get(&pos.slot.as_u256()).copied().unwrap_or_default();
        Ok(word_to_address(pos.extract_word(word)))
    }

    fn read_flag(&self, storage: &HashMap<U256, U256>) -> Result<bool, LayoutError> {
        let pos = self.layout.slot_position(&self.flag)?;
        let word = storage.get(&pos.slot.as_u256()).copied().unwrap_or_default();
        Ok(!pos.extract_word(word).is_zero())
    }
}

#[derive(Debug, Clone)]
enum Code {
    Registry(Arc<RegistryModel>),
    Forwarder,
    Opaque,
}

#[derive(Debug, Clone, Default)]
struct Account {
    balance: U256,
    storage: HashMap<U256, U256>,
    code: Option<Code>,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Address, Account>,
    nonces: HashMap<Address, u64>,
    receipts: HashMap<alloy::primitives::B256, TxReceipt>,
    block: u64,
    inclusion_delay: Duration,
    injected_reverts: HashMap<[u8; 4], String>,
    submissions: Vec<TxIntent>,
}

pub struct SimulatedLedger {
    sender: Address,
    state: Mutex<State>,
}

fn address_to_word(account: Address) -> U256 {
    U256::from_be_slice(account.as_slice())
}

fn word_to_address(word: U256) -> Address {
    Address::from_slice(&word.to_be_bytes::<32>()[12..])
}

fn word_bytes(word: U256) -> Bytes {
    Bytes::from(word.to_be_bytes::<32>().to_vec())
}


/// Mirrors `PUSH1 4 CALLDATALOAD`: the word at offset 4, zero-padded past the end.
fn forwarder_destination(input: &[u8]) -> Address {
    let mut word = [0u8; 32];
    if input.len() > 4 {
        let available = &input[4..input.len().min(36)];
        word[..available.len()].copy_from_slice(available);
    }
    Address::from_slice(&word[12..])
}

fn credit(accounts: &mut HashMap<Address, Account>, to: Address, value: U256) -> Result<(), String> {
    let account = accounts.entry(to).or_default();
    account.balance = account
        .balance
        .checked_add(value)
        .ok_or_else(|| "balance overflow".to_string())?;
    Ok(())
}

fn registry_call(
    model: &RegistryModel,
    account: &mut Account,
    sender: Address,
    input: &[u8],
    value: U256,
) -> Result<(), String> {
    let Some(selector) = selector_of(input) else {
        if model.rejects_value {
            return Err("registry does not accept plain transfers".to_string());
        }
        account.balance = account
            .balance
            .checked_add(value)
            .ok_or_else(|| "balance overflow".to_string())?;
        return Ok(());
    };
    if !value.is_zero() {
        return Err("function is not payable".to_string());
    }

    let layout = &model.layout;
    let length_slot = layout
        .slot_of(&model.array)
        .map_err(|e| e.to_string())?
        .as_u256();
    let length = account.storage.get(&length_slot).copied().unwrap_or_default();

    match selector {
        ITargetRegistry::retractEntryCall::SELECTOR => {
            let call = ITargetRegistry::retractEntryCall::abi_decode(input, true)
                .map_err(|e| e.to_string())?;
            // No emptiness check: an empty array wraps to 2^256 - 1.
            if call.index < length {
                let element = layout
                    .dynamic_array_element_slot(&model.array, Slot::new(call.index))
                    .map_err(|e| e.to_string())?;
                account.storage.remove(&element.as_u256());
            }
            account
                .storage
                .insert(length_slot, length.wrapping_sub(U256::from(1u64)));
            Ok(())
        }
        ITargetRegistry::editEntryCall::SELECTOR => {
            let call = decode_edit_entry(input).map_err(|e| e.to_string())?;
            if call.index >= length {
                return Err("index out of bounds".to_string());
            }
            let element = layout
                .dynamic_array_element_slot(&model.array, Slot::new(call.index))
                .map_err(|e| e.to_string())?;
            model.store_title(&mut account.storage, element, &call.title)
        }
        ITargetRegistry::captureCall::SELECTOR => {
            let owner = model
                .read_owner(&account.storage)
                .map_err(|e| e.to_string())?;
            if sender != owner {
                return Err("caller is not the owner".to_string());
            }
            let pos = layout
                .slot_position(&model.flag)
                .map_err(|e| e.to_string())?;
            let key = pos.slot.as_u256();
            let word = account.storage.get(&key).copied().unwrap_or_default();
            account
                .storage
                .insert(key, pos.insert_word(word, U256::from(1u64)));
            Ok(())
        }
        ITargetRegistry::ownerCall::SELECTOR | ITargetRegistry::flagCapturedCall::SELECTOR => Ok(()),
        _ => Err("unknown selector".to_string()),
    }
}

impl State {
    fn execute(
        &self,
        accounts: &mut HashMap<Address, Account>,
        sender: Address,
        nonce: u64,
        intent: &TxIntent,
    ) -> Result<Option<Address>, String> {
        if let (Some(_), Some(selector)) = (intent.to, selector_of(&intent.input)) {
            if let Some(reason) = self.injected_reverts.get(&selector) {
                return Err(reason.clone());
            }
        }

        let from = accounts.entry(sender).or_default();
        from.balance = from
            .balance
            .checked_sub(intent.value)
            .ok_or_else(|| "insufficient balance".to_string())?;

        let Some(to) = intent.to else {
            let created = sender.create(nonce);
            let code = if intent.input.as_ref() == FORWARDER_INIT_CODE.as_slice() {
                Code::Forwarder
            } else {
                Code::Opaque
            };
            accounts.entry(created).or_default().code = Some(code);
            credit(accounts, created, intent.value)?;
            return Ok(Some(created));
        };

        match accounts.get(&to).and_then(|a| a.code.clone()) {
            None | Some(Code::Opaque) => credit(accounts, to, intent.value)?,
            Some(Code::Forwarder) => {
                credit(accounts, to, intent.value)?;
                let destination = forwarder_destination(&intent.input);
                // The helper keeps its code but its whole balance moves, bypassing any
                // logic at the destination.
                let swept = accounts
                    .get_mut(&to)
                    .map(|helper| std::mem::take(&mut helper.balance))
                    .unwrap_or_default();
                credit(accounts, destination, swept)?;
            }
            Some(Code::Registry(model)) => {
                let account = accounts.entry(to).or_default();
                registry_call(&model, account, sender, &intent.input, intent.value)?;
            }
        }
        Ok(None)
    }
}

impl SimulatedLedger {
    pub fn new(sender: Address, sender_balance: U256) -> Self {
        let mut state = State::default();
        state.accounts.entry(sender).or_default().balance = sender_balance;
        Self {
            sender,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Places a registry at `address` owned by `owner`, with an empty array.
    pub fn install_registry(
        &self,
        address: Address,
        model: RegistryModel,
        owner: Address,
    ) -> Result<(), LayoutError> {
        let pos = model.layout.slot_position(&model.owner)?;
        model.layout.dynamic_array_base_slot(&model.array)?;
        model.layout.slot_position(&model.flag)?;

        let mut state = self.lock();
        let account = state.accounts.entry(address).or_default();
        let key = pos.slot.as_u256();
        let word = account.storage.get(&key).copied().unwrap_or_default();
        account
            .storage
            .insert(key, pos.insert_word(word, address_to_word(owner)));
        account.code = Some(Code::Registry(Arc::new(model)));
        Ok(())
    }

    pub fn set_storage(&self, address: Address, slot: Slot, value: U256) {
        self.lock()
            .accounts
            .entry(address)
            .or_default()
            .storage
            .insert(slot.as_u256(), value);
    }

    pub fn set_balance(&self, address: Address, value: U256) {
        self.lock().accounts.entry(address).or_default().balance = value;
    }

    pub fn set_rejects_value(&self, address: Address, rejects: bool) {
        let mut state = self.lock();
        if let Some(Code::Registry(model)) = state
            .accounts
            .get_mut(&address)
            .and_then(|account| account.code.as_mut())
        {
            Arc::make_mut(model).rejects_value = rejects;
        }
    }

    /// Receipts become visible only after `delay` has elapsed inside `wait_for_receipt`.
    pub fn set_inclusion_delay(&self, delay: Duration) {
        self.lock().inclusion_delay = delay;
    }

    /// Every later call whose selector matches reverts with `reason`.
    pub fn inject_revert(&self, selector: [u8; 4], reason: impl Into<String>) {
        self.lock().injected_reverts.insert(selector, reason.into());
    }

    pub fn clear_injected_reverts(&self) {
        self.lock().injected_reverts.clear();
    }

    pub fn storage_word(&self, address: Address, slot: Slot) -> U256 {
        self.lock()
            .accounts
            .get(&address)
            .and_then(|account| account.storage.get(&slot.as_u256()).copied())
            .unwrap_or_default()
    }

    /// Non-zero storage of `address`, ordered by slot.
    pub fn storage_dump(&self, address: Address) -> BTreeMap<U256, U256> {
        self.lock()
            .accounts
            .get(&address)
            .map(|account| {
                account
                    .storage
                    .iter()
                    .filter(|(_, value)| !value.is_zero())
                    .map(|(slot, value)| (*slot, *value))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.lock()
            .accounts
            .get(&address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.lock()
            .accounts
            .get(&address)
            .is_some_and(|account| account.code.is_some())
    }

    /// Every intent handed to `submit`, in order.
    pub fn submissions(&self) -> Vec<TxIntent> {
        self.lock().submissions.clone()
    }
}

#[async_trait]
impl Ledger for SimulatedLedger {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn submit(&self, intent: TxIntent) -> Result<PendingTx, LedgerError> {
        let sender = self.sender;
        let mut state = self.lock();
        let available = state
            .accounts
            .get(&sender)
            .map(|account| account.balance)
            .unwrap_or_default();
        if available < intent.value {
            return Err(LedgerError::Transport(format!(
                "insufficient funds: have {available} wei, need {}",
                intent.value
            )));
        }
        state.submissions.push(intent.clone());

        let nonce = {
            let slot = state.nonces.entry(sender).or_default();
            let current = *slot;
            *slot = current.saturating_add(1);
            current
        };
        let hash = keccak256([sender.as_slice(), &nonce.to_be_bytes()].concat());
        state.block = state.block.saturating_add(1);

        let mut accounts = state.accounts.clone();
        let receipt = match state.execute(&mut accounts, sender, nonce, &intent) {
            Ok(contract_address) => {
                state.accounts = accounts;
                TxReceipt {
                    hash,
                    success: true,
                    block_number: Some(state.block),
                    contract_address,
                    revert_reason: None,
                }
            }
            Err(reason) => TxReceipt {
                hash,
                success: false,
                block_number: Some(state.block),
                contract_address: None,
                revert_reason: Some(reason),
            },
        };
        tracing::debug!(
            tx_hash = %hash,
            nonce,
            success = receipt.success,
            reason = receipt.revert_reason.as_deref().unwrap_or(""),
            "simulated transaction"
        );
        state.receipts.insert(hash, receipt);
        Ok(PendingTx { hash })
    }

    async fn wait_for_receipt(&self, pending: &PendingTx) -> Result<TxReceipt, LedgerError> {
        let delay = self.lock().inclusion_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.lock()
            .receipts
            .get(&pending.hash)
            .cloned()
            .ok_or_else(|| LedgerError::Transport(format!("unknown transaction {:#x}", pending.hash)))
    }

    async fn read(&self, to: Address, input: Bytes) -> Result<Bytes, LedgerError> {
        let state = self.lock();
        let Some(account) = state.accounts.get(&to) else {
            return Err(LedgerError::Reverted(Some("call to empty account".to_string())));
        };
        let Some(Code::Registry(model)) = &account.code else {
            return Err(LedgerError::Reverted(None));
        };
        let layout_err = |err: LayoutError| LedgerError::Reverted(Some(err.to_string()));
        match selector_of(&input) {
            Some(ITargetRegistry::ownerCall::SELECTOR) => {
                let owner = model.read_owner(&account.storage).map_err(layout_err)?;
                Ok(word_bytes(address_to_word(owner)))
            }
            Some(ITargetRegistry::flagCapturedCall::SELECTOR) => {
                let flag = model.read_flag(&account.storage).map_err(layout_err)?;
                Ok(word_bytes(U256::from(flag as u8)))
            }
            _ => Err(LedgerError::Reverted(Some("unknown view".to_string()))),
        }
    }

    async fn storage_at(&self, address: Address, slot: Slot) -> Result<U256, LedgerError> {
        Ok(self.storage_word(address, slot))
    }

    async fn balance_of(&self, address: Address) -> Result<U256, LedgerError> {
        Ok(self.balance(address))
    }
}

/// Fixed accounts for a ready-made registry deployment.
pub mod fixture {
    use super::*;

    pub const TARGET: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
    pub const DEPLOYER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    pub const ATTACKER: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
    /// 10 ether.
    pub const ATTACKER_BALANCE_WEI: u64 = 10_000_000_000_000_000_000;
    pub const CODENAME: &str = "registry";

    /// Ledger signing as [`ATTACKER`] with the default registry deployed at [`TARGET`]:
    /// contacted, flag clear, a short codename, owned by [`DEPLOYER`], no entries.
    pub fn default_target(rejects_value: bool) -> Result<SimulatedLedger, LayoutError> {
        let ledger = SimulatedLedger::new(ATTACKER, U256::from(ATTACKER_BALANCE_WEI));
        let model = RegistryModel::default_target(rejects_value);
        let contacted = model.layout.slot_position(names::CONTACTED)?;
        let codename = model.layout.slot_of(names::CODENAME)?;
        ledger.install_registry(TARGET, model, DEPLOYER)?;
        ledger.set_storage(
            TARGET,
            contacted.slot,
            contacted.insert_word(U256::ZERO, U256::from(1u64)),
        );
        ledger.set_storage(TARGET, codename, short_string_word(CODENAME.as_bytes()));
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::abi;

    #[tokio::test]
    async fn test_retract_on_empty_array_wraps_length() {
        let ledger = fixture::default_target(true).unwrap();
        let pending = ledger
            .submit(TxIntent::call(
                fixture::TARGET,
                abi::retract_entry_calldata(U256::ZERO),
                U256::ZERO,
            ))
            .await
            .unwrap();
        assert!(ledger.wait_for_receipt(&pending).await.unwrap().success);
        assert_eq!(
            ledger.storage_word(fixture::TARGET, Slot::from_u64(3)),
            U256::MAX
        );
    }

    #[tokio::test]
    async fn test_edit_is_bounds_checked_against_length() {
        let ledger = fixture::default_target(true).unwrap();
        let pending = ledger
            .submit(TxIntent::call(
                fixture::TARGET,
                abi::edit_entry_calldata(U256::from(5u64), b"t", b"b"),
                U256::ZERO,
            ))
            .await
            .unwrap();
        let receipt = ledger.wait_for_receipt(&pending).await.unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.revert_reason.as_deref(), Some("index out of bounds"));
    }

    #[tokio::test]
    async fn test_plain_transfer_is_rejected_but_nonce_consumed() {
        let ledger = fixture::default_target(true).unwrap();
        let before = ledger.balance(fixture::TARGET);
        let pending = ledger
            .submit(TxIntent::call(fixture::TARGET, Bytes::new(), U256::from(7u64)))
            .await
            .unwrap();
        assert!(!ledger.wait_for_receipt(&pending).await.unwrap().success);
        assert_eq!(ledger.balance(fixture::TARGET), before);
        assert_eq!(
            ledger.balance(fixture::ATTACKER),
            U256::from(fixture::ATTACKER_BALANCE_WEI)
        );

        let next = ledger
            .submit(TxIntent::deploy(Bytes::from_static(&FORWARDER_INIT_CODE)))
            .await
            .unwrap();
        let receipt = ledger.wait_for_receipt(&next).await.unwrap();
        assert_eq!(receipt.contract_address, Some(fixture::ATTACKER.create(1)));
    }

    #[tokio::test]
    async fn test_capture_requires_owner() {
        let ledger = fixture::default_target(true).unwrap();
        let pending = ledger
            .submit(TxIntent::call(
                fixture::TARGET,
                abi::capture_calldata(),
                U256::ZERO,
            ))
            .await
            .unwrap();
        let receipt = ledger.wait_for_receipt(&pending).await.unwrap();
        assert_eq!(
            receipt.revert_reason.as_deref(),
            Some("caller is not the owner")
        );
    }

    #[test]
    fn test_forwarder_destination_reads_first_argument() {
        let destination = Address::repeat_byte(0x42);
        assert_eq!(
            forwarder_destination(&abi::forward_calldata(destination)),
            destination
        );
        assert_eq!(forwarder_destination(&[0u8; 4]), Address::ZERO);
    }

    fn string_registry(owner: Address) -> SimulatedLedger {
        let ledger =
            SimulatedLedger::new(fixture::ATTACKER, U256::from(fixture::ATTACKER_BALANCE_WEI));
        let model = RegistryModel::default_target(true)
            .with_title_encoding(TitleEncoding::SolidityString);
        ledger.install_registry(fixture::TARGET, model, owner).unwrap();
        ledger
    }

    async fn send(ledger: &SimulatedLedger, input: Bytes) -> TxReceipt {
        let pending = ledger
            .submit(TxIntent::call(fixture::TARGET, input, U256::ZERO))
            .await
            .unwrap();
        ledger.wait_for_receipt(&pending).await.unwrap()
    }

    fn owner_index() -> U256 {
        let base = StorageLayout::default_target()
            .dynamic_array_base_slot(names::ENTRIES)
            .unwrap();
        Slot::from_u64(2).wrapping_sub(base).as_u256()
    }

    async fn owner_of(ledger: &SimulatedLedger) -> Address {
        let raw = ledger
            .read(fixture::TARGET, abi::owner_calldata())
            .await
            .unwrap();
        Address::from_slice(&raw[12..32])
    }

    #[tokio::test]
    async fn test_checksummed_title_lands_as_long_string_header() {
        let ledger = string_registry(Address::ZERO);
        assert!(send(&ledger, abi::retract_entry_calldata(U256::ZERO)).await.success);

        let title = fixture::ATTACKER.to_checksum(None);
        let receipt = send(
            &ledger,
            abi::edit_entry_calldata(owner_index(), title.as_bytes(), b""),
        )
        .await;
        assert!(receipt.success, "{:?}", receipt.revert_reason);

        let owner_slot = Slot::from_u64(2);
        assert_eq!(ledger.storage_word(fixture::TARGET, owner_slot), U256::from(0x55u64));
        assert_eq!(owner_of(&ledger).await, Address::with_last_byte(0x55));
        let data = derive_dynamic_array_base_slot(owner_slot);
        assert_eq!(
            ledger.storage_word(fixture::TARGET, data),
            bytes32_word(&title.as_bytes()[..32])
        );
    }

    #[tokio::test]
    async fn test_string_write_over_inconsistent_word_panics() {
        let ledger = string_registry(fixture::DEPLOYER);
        assert!(send(&ledger, abi::retract_entry_calldata(U256::ZERO)).await.success);

        let receipt = send(&ledger, abi::edit_entry_calldata(owner_index(), b"x", b"")).await;
        assert!(!receipt.success);
        assert_eq!(
            receipt.revert_reason.as_deref(),
            Some("Panic(0x22): invalid storage byte array encoding")
        );
        assert_eq!(owner_of(&ledger).await, fixture::DEPLOYER);
    }

    #[tokio::test]
    async fn test_string_write_over_huge_length_runs_out_of_gas() {
        let ledger = string_registry(Address::ZERO);
        assert!(send(&ledger, abi::retract_entry_calldata(U256::ZERO)).await.success);
        ledger.set_storage(fixture::TARGET, Slot::from_u64(2), U256::MAX);

        let receipt = send(&ledger, abi::edit_entry_calldata(owner_index(), b"x", b"")).await;
        assert_eq!(receipt.revert_reason.as_deref(), Some("out of gas"));
    }

    #[tokio::test]
    async fn test_bytes32_elements_keep_title_bytes_verbatim() {
        let ledger = fixture::default_target(true).unwrap();
        assert!(send(&ledger, abi::retract_entry_calldata(U256::ZERO)).await.success);

        let mut title = [0u8; 32];
        title[12..].copy_from_slice(fixture::ATTACKER.as_slice());
        assert!(
            send(&ledger, abi::edit_entry_calldata(owner_index(), &title, b"")).await.success
        );
        assert_eq!(owner_of(&ledger).await, fixture::ATTACKER);

        // Hex text is stored as text, not parsed back into an address.
        let text = fixture::ATTACKER.to_checksum(None);
        assert!(
            send(&ledger, abi::edit_entry_calldata(owner_index(), text.as_bytes(), b""))
                .await
                .success
        );
        assert_ne!(owner_of(&ledger).await, fixture::ATTACKER);
        assert_eq!(
            ledger.storage_word(fixture::TARGET, Slot::from_u64(2)),
            bytes32_word(text.as_bytes())
        );
    }
}
