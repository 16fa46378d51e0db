use alloy::primitives::{Address, U256};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, TestCaseError, TestRunner};
use slot_forge::solver::funding::ForcedFundingPlanner;
use slot_forge::solver::UnderflowPlanner;
use slot_forge::storage::{derive_dynamic_array_base_slot, Slot, StorageLayout};

const SCALAR_TYPES: [&str; 6] = ["bool", "address", "uint8", "uint128", "uint256", "bytes4"];

fn layout_with_prefix(prefix: &[&str]) -> Result<(StorageLayout, Vec<String>), String> {
    let names: Vec<String> = (0..prefix.len()).map(|i| format!("v{i}")).collect();
    let mut decls: Vec<(&str, &str)> = names
        .iter()
        .map(String::as_str)
        .zip(prefix.iter().copied())
        .collect();
    decls.push(("items", "string[]"));
    let layout = StorageLayout::from_solidity(&decls).map_err(|e| e.to_string())?;
    Ok((layout, names))
}

fn check_index_lands_on_target(prefix: Vec<&str>, pick: usize) -> Result<(), String> {
    let (layout, names) = layout_with_prefix(&prefix)?;
    let variable = &names[pick % names.len()];
    let solution = UnderflowPlanner::new(&layout)
        .solve_for_variable("items", variable)
        .map_err(|e| e.to_string())?;

    let expected_base = derive_dynamic_array_base_slot(solution.length_slot);
    if solution.base_slot != expected_base {
        return Err(format!("base mismatch for {prefix:?}"));
    }
    let target = layout.slot_of(variable).map_err(|e| e.to_string())?;
    if solution.base_slot.wrapping_add(solution.index) != target {
        return Err(format!(
            "index {} from base {} misses {target} ({prefix:?})",
            solution.index, solution.base_slot
        ));
    }
    Ok(())
}

#[test]
fn test_solved_index_always_lands_on_declared_slot() {
    let mut runner = TestRunner::new(ProptestConfig {
        cases: 512,
        ..ProptestConfig::default()
    });
    let strategy = (
        prop::collection::vec(prop::sample::select(SCALAR_TYPES.to_vec()), 1..12),
        any::<usize>(),
    );
    let result = runner.run(&strategy, |(prefix, pick)| {
        check_index_lands_on_target(prefix, pick).map_err(TestCaseError::fail)
    });
    if let Err(err) = result {
        panic!("underflow index property failed: {err}");
    }
}

#[test]
fn test_wrapping_solve_holds_for_arbitrary_slots() {
    let mut runner = TestRunner::new(ProptestConfig {
        cases: 2_048,
        ..ProptestConfig::default()
    });
    let word = any::<[u8; 32]>().prop_map(U256::from_be_bytes);
    let result = runner.run(&(word.clone(), word), |(length, target)| {
        let base = derive_dynamic_array_base_slot(Slot::new(length));
        let index = Slot::new(target).wrapping_sub(base);
        prop_assert_eq!(base.wrapping_add(index), Slot::new(target));
        prop_assert_eq!(index.wrapping_add(base).wrapping_sub(index), base);
        Ok(())
    });
    if let Err(err) = result {
        panic!("wrapping arithmetic property failed: {err}");
    }
}

#[test]
fn test_layout_assignment_is_deterministic() {
    let mut runner = TestRunner::new(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    });
    let strategy = prop::collection::vec(prop::sample::select(SCALAR_TYPES.to_vec()), 0..16);
    let result = runner.run(&strategy, |prefix| {
        let (first, _) = layout_with_prefix(&prefix).map_err(TestCaseError::fail)?;
        let (second, _) = layout_with_prefix(&prefix).map_err(TestCaseError::fail)?;
        prop_assert_eq!(&first, &second);

        let mut last = Slot::ZERO;
        for (_, position) in first.variables() {
            prop_assert!(position.slot >= last, "slots must be non-decreasing");
            prop_assert!(position.offset + position.byte_size <= 32);
            last = position.slot;
        }
        Ok(())
    });
    if let Err(err) = result {
        panic!("layout determinism property failed: {err}");
    }
}

#[test]
fn test_funding_value_strictly_exceeds_minimum() {
    let mut runner = TestRunner::new(ProptestConfig {
        cases: 1_024,
        ..ProptestConfig::default()
    });
    let result = runner.run(&(any::<u128>(), 0u64..50_000), |(minimum, bps)| {
        let minimum = U256::from(minimum);
        let planner = ForcedFundingPlanner::new(bps);
        let value = planner
            .funding_value(minimum)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(value > minimum);
        let step = planner
            .build_funding_step(Address::ZERO, minimum)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(step.value(), value);
        Ok(())
    });
    if let Err(err) = result {
        panic!("funding value property failed: {err}");
    }
}
