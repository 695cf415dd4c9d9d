//! REST API tests - declarative end-to-end checks for HTTP services
//!
//! Scenarios are YAML files describing HTTP calls and the JSON each call is
//! expected to return. They live in a directory tree whose levels contribute
//! shared context and setup/teardown scenarios.

pub mod cli;
pub mod commands;
pub mod common;
pub mod expr;
pub mod http;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
