//! Static variable-to-slot layout of a contract, derived from declaration order.
//!
//! Packing follows the compiler's rule: consecutive values smaller than a word share a slot
//! while their byte sizes fit in 32 bytes. Anything that needs a whole word (strings, bytes,
//! dynamic arrays, full-width integers) starts on a fresh slot, and the next declaration
//! after it starts on a fresh slot as well.

use crate::error::LayoutError;
use crate::storage::slot::{derive_dynamic_array_base_slot, Slot};
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const WORD_BYTES: usize = 32;

/// Subset of solidity value types whose storage footprint the layout needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolType {
    Bool,
    Address,
    Uint(u16),
    Int(u16),
    FixedBytes(u8),
    String,
    Bytes,
    DynamicArray(Box<SolType>),
}

impl SolType {
    pub fn parse(raw: &str) -> Result<Self, LayoutError> {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed.strip_suffix("[]") {
            return Ok(Self::DynamicArray(Box::new(Self::parse(inner)?)));
        }
        let unsupported = || LayoutError::UnsupportedType(trimmed.to_string());
        match trimmed {
            "bool" => return Ok(Self::Bool),
            "address" | "address payable" => return Ok(Self::Address),
            "string" => return Ok(Self::String),
            "bytes" => return Ok(Self::Bytes),
            "uint" => return Ok(Self::Uint(256)),
            "int" => return Ok(Self::Int(256)),
            _ => {}
        }
        if let Some(bits) = trimmed.strip_prefix("uint") {
            return parse_int_bits(bits).map(Self::Uint).ok_or_else(unsupported);
        }
        if let Some(bits) = trimmed.strip_prefix("int") {
            return parse_int_bits(bits).map(Self::Int).ok_or_else(unsupported);
        }
        if let Some(len) = trimmed.strip_prefix("bytes") {
            return len
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=32).contains(n))
                .map(Self::FixedBytes)
                .ok_or_else(unsupported);
        }
        Err(unsupported())
    }

    /// Bytes occupied in the declaring slot. Dynamic types report a full word of metadata.
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Address => 20,
            Self::Uint(bits) | Self::Int(bits) => usize::from(*bits) / 8,
            Self::FixedBytes(len) => usize::from(*len),
            Self::String | Self::Bytes | Self::DynamicArray(_) => WORD_BYTES,
        }
    }

    pub fn is_dynamic_array(&self) -> bool {
        matches!(self, Self::DynamicArray(_))
    }
}

fn parse_int_bits(raw: &str) -> Option<u16> {
    raw.parse::<u16>()
        .ok()
        .filter(|bits| *bits >= 8 && *bits <= 256 && bits % 8 == 0)
}

/// One declared state variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDecl {
    pub name: String,
    pub byte_size: usize,
    pub is_dynamic_array: bool,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, byte_size: usize, is_dynamic_array: bool) -> Self {
        Self {
            name: name.into(),
            byte_size,
            is_dynamic_array,
        }
    }

    pub fn from_sol_type(name: impl Into<String>, ty: &SolType) -> Self {
        Self::new(name, ty.byte_size(), ty.is_dynamic_array())
    }

    fn occupies_whole_slot(&self) -> bool {
        self.is_dynamic_array || self.byte_size >= WORD_BYTES
    }

    fn slot_span(&self) -> u64 {
        (self.byte_size.max(1).div_ceil(WORD_BYTES)) as u64
    }
}

/// Where a variable starts: its slot plus the byte offset from the low-order end of the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPosition {
    pub slot: Slot,
    pub offset: usize,
    pub byte_size: usize,
}

impl SlotPosition {
    /// Right-aligned value of this variable inside a full slot word.
    pub fn extract_word(&self, word: U256) -> U256 {
        if self.byte_size >= WORD_BYTES {
            return word;
        }
        let mask = (U256::from(1u64) << (self.byte_size * 8)) - U256::from(1u64);
        (word >> (self.offset * 8)) & mask
    }

    /// `word` with this variable's bytes replaced by `value`; neighbouring packed values kept.
    pub fn insert_word(&self, word: U256, value: U256) -> U256 {
        if self.byte_size >= WORD_BYTES {
            return value;
        }
        let mask = (U256::from(1u64) << (self.byte_size * 8)) - U256::from(1u64);
        let shift = self.offset * 8;
        let cleared = word & !(mask << shift);
        cleared | ((value & mask) << shift)
    }
}

/// Immutable slot assignment for one contract's declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    decls: Vec<VariableDecl>,
    positions: Vec<SlotPosition>,
    by_name: HashMap<String, usize>,
}

impl StorageLayout {
    pub fn new(decls: Vec<VariableDecl>) -> Result<Self, LayoutError> {
        let mut seen = HashSet::with_capacity(decls.len());
        if let Some(dup) = decls.iter().find(|decl| !seen.insert(decl.name.as_str())) {
            return Err(LayoutError::DuplicateVariable(dup.name.clone()));
        }
        Ok(Self::from_unique_decls(decls))
    }

    /// Callers guarantee names are unique.
    fn from_unique_decls(decls: Vec<VariableDecl>) -> Self {
        let by_name = decls
            .iter()
            .enumerate()
            .map(|(idx, decl)| (decl.name.clone(), idx))
            .collect();
        let positions = assign_positions(&decls);
        Self {
            decls,
            positions,
            by_name,
        }
    }

    /// Build from `(name, solidity type)` pairs in declaration order.
    pub fn from_solidity(declarations: &[(&str, &str)]) -> Result<Self, LayoutError> {
        let decls = declarations
            .iter()
            .map(|(name, ty)| SolType::parse(ty).map(|t| VariableDecl::from_sol_type(*name, &t)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(decls)
    }

    /// Layout of the vulnerable registry contract this tool targets:
    /// `bool contacted; bool flagCaptured; string codename; address owner; string[] entries;`
    pub fn default_target() -> Self {
        let decls = vec![
            VariableDecl::new(names::CONTACTED, 1, false),
            VariableDecl::new(names::FLAG_CAPTURED, 1, false),
            VariableDecl::new(names::CODENAME, WORD_BYTES, false),
            VariableDecl::new(names::OWNER, 20, false),
            VariableDecl::new(names::ENTRIES, WORD_BYTES, true),
        ];
        Self::from_unique_decls(decls)
    }

    pub fn slot_of(&self, name: &str) -> Result<Slot, LayoutError> {
        self.slot_position(name).map(|pos| pos.slot)
    }

    pub fn slot_position(&self, name: &str) -> Result<SlotPosition, LayoutError> {
        self.by_name
            .get(name)
            .map(|idx| self.positions[*idx])
            .ok_or_else(|| LayoutError::UnknownVariable(name.to_string()))
    }

    pub fn declaration(&self, name: &str) -> Result<&VariableDecl, LayoutError> {
        self.by_name
            .get(name)
            .map(|idx| &self.decls[*idx])
            .ok_or_else(|| LayoutError::UnknownVariable(name.to_string()))
    }

    /// `base(slot_of(array)) + index`, wrapping. Elements occupy one slot each.
    pub fn dynamic_array_element_slot(&self, array: &str, index: Slot) -> Result<Slot, LayoutError> {
        Ok(self.dynamic_array_base_slot(array)?.wrapping_add(index))
    }

    pub fn dynamic_array_base_slot(&self, array: &str) -> Result<Slot, LayoutError> {
        let decl = self.declaration(array)?;
        if !decl.is_dynamic_array {
            return Err(LayoutError::NotDynamicArray(array.to_string()));
        }
        Ok(derive_dynamic_array_base_slot(self.slot_of(array)?))
    }

    pub fn variables(&self) -> impl Iterator<Item = (&VariableDecl, &SlotPosition)> {
        self.decls.iter().zip(self.positions.iter())
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

/// Variable names of [`StorageLayout::default_target`].
pub mod names {
    pub const CONTACTED: &str = "contacted";
    pub const FLAG_CAPTURED: &str = "flagCaptured";
    pub const CODENAME: &str = "codename";
    pub const OWNER: &str = "owner";
    pub const ENTRIES: &str = "entries";
}

fn assign_positions(decls: &[VariableDecl]) -> Vec<SlotPosition> {
    let mut positions = Vec::with_capacity(decls.len());
    let mut slot = Slot::ZERO;
    let mut used = 0usize;

    for decl in decls {
        if decl.occupies_whole_slot() {
            if used > 0 {
                slot = slot.offset(1);
                used = 0;
            }
            positions.push(SlotPosition {
                slot,
                offset: 0,
                byte_size: decl.byte_size.max(WORD_BYTES),
            });
            slot = slot.offset(decl.slot_span());
            continue;
        }

        if used + decl.byte_size > WORD_BYTES {
            slot = slot.offset(1);
            used = 0;
        }
        positions.push(SlotPosition {
            slot,
            offset: used,
            byte_size: decl.byte_size,
        });
        used += decl.byte_size;
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target_slots() {
        let layout = StorageLayout::default_target();
        let slots = [
            names::CONTACTED,
            names::FLAG_CAPTURED,
            names::CODENAME,
            names::OWNER,
            names::ENTRIES,
        ]
        .map(|name| layout.slot_of(name).unwrap());
        assert_eq!(slots, [0u64, 0, 1, 2, 3].map(Slot::from_u64));
        assert_eq!(layout.slot_position(names::FLAG_CAPTURED).unwrap().offset, 1);
    }

    #[test]
    fn test_from_solidity_matches_default_target() {
        let parsed = StorageLayout::from_solidity(&[
            ("contacted", "bool"),
            ("flagCaptured", "bool"),
            ("codename", "string"),
            ("owner", "address"),
            ("entries", "string[]"),
        ])
        .unwrap();
        assert_eq!(parsed, StorageLayout::default_target());
    }

    #[test]
    fn test_packing_spills_when_word_would_overflow() {
        let layout = StorageLayout::from_solidity(&[
            ("a", "uint128"),
            ("b", "address"),
            ("c", "uint96"),
            ("d", "uint256"),
            ("e", "bool"),
        ])
        .unwrap();
        assert_eq!(layout.slot_of("a").unwrap(), Slot::from_u64(0));
        // 16 + 20 > 32
        assert_eq!(layout.slot_of("b").unwrap(), Slot::from_u64(1));
        assert_eq!(layout.slot_position("c").unwrap().offset, 20);
        assert_eq!(layout.slot_of("c").unwrap(), Slot::from_u64(1));
        assert_eq!(layout.slot_of("d").unwrap(), Slot::from_u64(2));
        assert_eq!(layout.slot_of("e").unwrap(), Slot::from_u64(3));
    }

    #[test]
    fn test_unknown_variable_is_reported() {
        let layout = StorageLayout::default_target();
        assert_eq!(
            layout.slot_of("treasury"),
            Err(LayoutError::UnknownVariable("treasury".to_string()))
        );
    }

    #[test]
    fn test_element_slot_requires_dynamic_array() {
        let layout = StorageLayout::default_target();
        assert_eq!(
            layout.dynamic_array_element_slot(names::OWNER, Slot::ZERO),
            Err(LayoutError::NotDynamicArray(names::OWNER.to_string()))
        );
        let base = derive_dynamic_array_base_slot(Slot::from_u64(3));
        assert_eq!(
            layout
                .dynamic_array_element_slot(names::ENTRIES, Slot::from_u64(5))
                .unwrap(),
            base.offset(5)
        );
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let err = StorageLayout::from_solidity(&[("x", "bool"), ("x", "uint8")]).unwrap_err();
        assert_eq!(err, LayoutError::DuplicateVariable("x".to_string()));
    }

    #[test]
    fn test_sol_type_parsing() {
        assert_eq!(SolType::parse("uint8").unwrap().byte_size(), 1);
        assert_eq!(SolType::parse("bytes4").unwrap().byte_size(), 4);
        assert!(SolType::parse("address[]").unwrap().is_dynamic_array());
        assert!(SolType::parse("uint7").is_err());
        assert!(SolType::parse("bytes33").is_err());
        assert!(SolType::parse("mapping(address => uint256)").is_err());
    }

    #[test]
    fn test_packed_word_roundtrip_keeps_neighbours() {
        let layout = StorageLayout::default_target();
        let contacted = layout.slot_position(names::CONTACTED).unwrap();
        let flag = layout.slot_position(names::FLAG_CAPTURED).unwrap();
        let word = contacted.insert_word(U256::ZERO, U256::from(1u64));
        let word = flag.insert_word(word, U256::from(1u64));
        assert_eq!(word, U256::from(0x0101u64));
        let word = flag.insert_word(word, U256::ZERO);
        assert_eq!(contacted.extract_word(word), U256::from(1u64));
        assert_eq!(flag.extract_word(word), U256::ZERO);
    }
}
