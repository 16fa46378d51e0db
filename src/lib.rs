//! Storage-collision exploit planner and executor.
//!
//! `storage` models Solidity slot assignment and the wrapping arithmetic over it, `solver`
//! turns a layout into an ordered [`solver::plan::ExploitPlan`], and `executor` drives that
//! plan through a [`ledger::Ledger`] before handing the result to a verifier.

pub mod error;
pub mod executor;
pub mod ledger;
pub mod runtime;
pub mod solver;
pub mod storage;
pub mod utils;
