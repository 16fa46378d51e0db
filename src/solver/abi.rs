//! Call surfaces of the target registry contract and the funding helper.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};

alloy::sol! {
    interface ITargetRegistry {
        function owner() external view returns (address account);
        function flagCaptured() external view returns (bool captured);
        function editEntry(uint256 index, string calldata title, string calldata body) external;
        function retractEntry(uint256 index) external;
        function capture() external;
    }

    interface IValueForwarder {
        function forward(address destination) external payable;
    }
}

/// `editEntry` with raw title and body bytes. `string` and `bytes` share one ABI encoding
/// and the contract never checks UTF-8, so any byte sequence is a valid title.
pub fn edit_entry_calldata(index: U256, title: &[u8], body: &[u8]) -> Bytes {
    let args = (index, Bytes::copy_from_slice(title), Bytes::copy_from_slice(body));
    let mut data = ITargetRegistry::editEntryCall::SELECTOR.to_vec();
    data.extend_from_slice(&args.abi_encode_params());
    data.into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEntryArgs {
    pub index: U256,
    pub title: Bytes,
    pub body: Bytes,
}

/// Decodes full `editEntry` calldata, selector included, keeping the strings as raw bytes.
pub fn decode_edit_entry(input: &[u8]) -> Result<EditEntryArgs, alloy::sol_types::Error> {
    let args = input.get(4..).unwrap_or_default();
    let (index, title, body) = <(U256, Bytes, Bytes)>::abi_decode_params(args, true)?;
    Ok(EditEntryArgs { index, title, body })
}

pub fn retract_entry_calldata(index: U256) -> Bytes {
    ITargetRegistry::retractEntryCall { index }.abi_encode().into()
}

pub fn capture_calldata() -> Bytes {
    ITargetRegistry::captureCall {}.abi_encode().into()
}

pub fn owner_calldata() -> Bytes {
    ITargetRegistry::ownerCall {}.abi_encode().into()
}

pub fn flag_captured_calldata() -> Bytes {
    ITargetRegistry::flagCapturedCall {}.abi_encode().into()
}

pub fn forward_calldata(destination: Address) -> Bytes {
    IValueForwarder::forwardCall { destination }.abi_encode().into()
}

/// First four bytes of `input`, when present.
pub fn selector_of(input: &[u8]) -> Option<[u8; 4]> {
    input.get(..4).and_then(|s| s.try_into().ok())
}
