//! Storage slot arithmetic.
//!
//! Slots live in a 2^256 address space. The target runtime performs no overflow checks on
//! index arithmetic, so every operation here wraps silently instead of failing. Wraparound is
//! modelled by the [`Slot`] type itself rather than relied on implicitly.

use alloy::primitives::{keccak256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// One 32-byte storage cell index. `+` and `-` wrap modulo 2^256.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Slot(U256);

impl Slot {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const MAX: Self = Self(U256::MAX);

    pub const fn new(raw: U256) -> Self {
        Self(raw)
    }

    pub fn from_u64(raw: u64) -> Self {
        Self(U256::from(raw))
    }

    pub const fn as_u256(self) -> U256 {
        self.0
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }

    pub fn wrapping_add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }

    pub fn wrapping_sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }

    /// Advance by a small count of slots (struct fields, multi-slot variables).
    pub fn offset(self, count: u64) -> Self {
        self.wrapping_add(Self::from_u64(count))
    }
}

impl Add for Slot {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
}

impl Sub for Slot {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }
}

impl From<U256> for Slot {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}

impl From<u64> for Slot {
    fn from(raw: u64) -> Self {
        Self::from_u64(raw)
    }
}

impl From<Slot> for U256 {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Base slot of element 0 of a dynamic array whose length lives at `length_slot`:
/// `keccak256(abi.encode(length_slot))`.
pub fn derive_dynamic_array_base_slot(length_slot: Slot) -> Slot {
    let digest = keccak256(length_slot.to_be_bytes());
    Slot(U256::from_be_bytes(digest.0))
}

pub fn wrapping_add(a: Slot, b: Slot) -> Slot {
    a.wrapping_add(b)
}

pub fn wrapping_sub(a: Slot, b: Slot) -> Slot {
    a.wrapping_sub(b)
}
