//! Scenario execution engine
//!
//! Reads YAML scenario trees, layers per-directory context over every step,
//! sends the described HTTP calls and checks the JSON responses against
//! expectation templates. Assertions are made against structured data rather
//! than response text.

pub mod context;
pub mod expect;
pub mod retry;
pub mod runner;
pub mod scenario;
pub mod select;
pub mod step;
pub mod suite;
pub mod tree;

pub use expect::check_result;
pub use runner::{run_scenario, ScenarioOutcome};
pub use step::StepExecutor;
pub use suite::{Suite, SuiteOptions, SuiteReport};
pub use tree::{PathTree, TreeVisitor};
