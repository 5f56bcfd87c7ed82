//! labtest - golden-trace test harness for the compiler labs
//!
//! This library runs declared scenarios against external lab binaries,
//! compares their output with golden traces and produces JUnit reports.

pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{ExecutionResult, Report, Scenario, Status, Suite};
