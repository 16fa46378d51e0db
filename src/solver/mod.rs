pub mod abi;
pub mod funding;
pub mod plan;
pub mod underflow;

pub use funding::ForcedFundingPlanner;
pub use plan::{Condition, ExploitPlan, PlanConfig, Step, StepAction};
pub use underflow::{UnderflowPlanner, UnderflowSolution};
