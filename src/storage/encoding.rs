//! How the target's indexed write lays its title argument into the element slot.
//!
//! The element type decides it. A registry keeping `bytes32(bytes(title))` per element stores
//! the first 32 title bytes verbatim. A registry keeping native `string` elements uses the
//! compiler's byte-array encoding: up to 31 bytes inline with `2 * len` in the lowest byte,
//! anything longer as a `2 * len + 1` header with the data at `keccak256(slot)` onward.

use crate::storage::slot::{derive_dynamic_array_base_slot, Slot};
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SHORT_STRING_MAX: usize = 31;
const WORD: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TitleEncoding {
    #[default]
    Bytes32Word,
    SolidityString,
}

impl TitleEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bytes32Word => "bytes32",
            Self::SolidityString => "string",
        }
    }

    /// Title bytes whose stored form is exactly `word`, if any title can produce it.
    ///
    /// A string write always sets the lowest byte to the length tag and zeroes the bytes
    /// between the inline data and the tag, so most words are unreachable that way.
    pub fn title_for_word(&self, word: U256) -> Option<Vec<u8>> {
        let bytes = word.to_be_bytes::<WORD>();
        match self {
            Self::Bytes32Word => Some(bytes.to_vec()),
            Self::SolidityString => {
                let tag = bytes[WORD - 1];
                let len = usize::from(tag / 2);
                if tag % 2 != 0 || len > SHORT_STRING_MAX {
                    return None;
                }
                bytes[len..WORD - 1]
                    .iter()
                    .all(|b| *b == 0)
                    .then(|| bytes[..len].to_vec())
            }
        }
    }
}

impl fmt::Display for TitleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TitleEncoding {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bytes32" => Ok(Self::Bytes32Word),
            "string" => Ok(Self::SolidityString),
            other => Err(format!("unknown title encoding `{other}` (expected bytes32 or string)")),
        }
    }
}

/// First 32 bytes of `value`, left-aligned and zero-padded.
pub fn bytes32_word(value: &[u8]) -> U256 {
    let mut word = [0u8; WORD];
    let len = value.len().min(WORD);
    word[..len].copy_from_slice(&value[..len]);
    U256::from_be_bytes(word)
}

/// Inline string word; input past 31 bytes is dropped.
pub fn short_string_word(value: &[u8]) -> U256 {
    let len = value.len().min(SHORT_STRING_MAX);
    let mut word = [0u8; WORD];
    word[..len].copy_from_slice(&value[..len]);
    word[WORD - 1] = (len * 2) as u8;
    U256::from_be_bytes(word)
}

/// Byte length announced by a string header word, or `None` where the compiler panics
/// (`0x22`): an inline value claiming 32 or more bytes, or an out-of-line one claiming fewer.
pub fn string_storage_length(word: U256) -> Option<U256> {
    let out_of_place = word.bit(0);
    let half = word >> 1;
    let length = if out_of_place {
        half
    } else {
        half & U256::from(0x7fu64)
    };
    (out_of_place == (length >= U256::from(WORD as u64))).then_some(length)
}

/// Data slots an out-of-line string of `length` bytes occupies after its header.
pub fn string_data_slot_count(length: U256) -> U256 {
    if length <= U256::from(SHORT_STRING_MAX as u64) {
        return U256::ZERO;
    }
    (length + U256::from(SHORT_STRING_MAX as u64)) / U256::from(WORD as u64)
}

/// Every `(slot, word)` a string assignment of `value` to `slot` writes.
pub fn string_storage_writes(slot: Slot, value: &[u8]) -> Vec<(Slot, U256)> {
    if value.len() <= SHORT_STRING_MAX {
        return vec![(slot, short_string_word(value))];
    }
    let header = U256::from(value.len() as u64 * 2 + 1);
    let data = derive_dynamic_array_base_slot(slot);
    std::iter::once((slot, header))
        .chain(
            value
                .chunks(WORD)
                .enumerate()
                .map(|(k, chunk)| (data.offset(k as u64), bytes32_word(chunk))),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address_word(last: u8) -> U256 {
        let mut bytes = [0x11u8; WORD];
        bytes[..12].fill(0);
        bytes[WORD - 1] = last;
        U256::from_be_bytes(bytes)
    }

    #[test]
    fn test_long_string_writes_header_and_data() {
        let title = b"0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
        let writes = string_storage_writes(Slot::from_u64(2), title);
        assert_eq!(writes[0], (Slot::from_u64(2), U256::from(0x55u64)));
        let data = derive_dynamic_array_base_slot(Slot::from_u64(2));
        assert_eq!(writes[1], (data, bytes32_word(&title[..32])));
        assert_eq!(writes[2], (data.offset(1), bytes32_word(&title[32..])));
        assert_eq!(writes.len(), 3);
        assert_eq!(string_storage_length(writes[0].1), Some(U256::from(42u64)));
    }

    #[test]
    fn test_inconsistent_headers_are_rejected() {
        assert_eq!(string_storage_length(U256::ZERO), Some(U256::ZERO));
        assert_eq!(
            string_storage_length(short_string_word(b"registry")),
            Some(U256::from(8u64))
        );
        // Inline tag 0x66 claims 51 bytes.
        assert_eq!(string_storage_length(address_word(0x66)), None);
        // Out-of-line header claiming 3 bytes.
        assert_eq!(string_storage_length(U256::from(7u64)), None);
        assert_eq!(string_data_slot_count(U256::from(42u64)), U256::from(2u64));
        assert_eq!(string_data_slot_count(U256::from(31u64)), U256::ZERO);
    }

    #[test]
    fn test_string_titles_reach_only_tag_shaped_words() {
        let reachable = address_word(0x3e);
        let title = TitleEncoding::SolidityString
            .title_for_word(reachable)
            .expect("0x3e tags a 31-byte inline string");
        assert_eq!(title.len(), 31);
        assert_eq!(short_string_word(&title), reachable);

        assert_eq!(TitleEncoding::SolidityString.title_for_word(address_word(0xc8)), None);
        assert_eq!(TitleEncoding::SolidityString.title_for_word(address_word(0x3f)), None);
        // Tag 0x20 keeps 16 inline bytes, but the address bytes above them are not zero.
        assert_eq!(TitleEncoding::SolidityString.title_for_word(address_word(0x20)), None);

        let verbatim = TitleEncoding::Bytes32Word
            .title_for_word(address_word(0xc8))
            .unwrap();
        assert_eq!(bytes32_word(&verbatim), address_word(0xc8));
    }

    #[test]
    fn test_encoding_names_parse() {
        assert_eq!("bytes32".parse(), Ok(TitleEncoding::Bytes32Word));
        assert_eq!(" String ".parse(), Ok(TitleEncoding::SolidityString));
        assert!("utf8".parse::<TitleEncoding>().is_err());
    }
}
