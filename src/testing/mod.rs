//! Golden-trace test runner
//!
//! Builds the lab sub-projects, runs each scenario of a suite, compares the
//! captured output with its golden trace and collects the outcomes into a
//! JUnit report.

pub mod build;
mod config;
mod diff;
pub mod precheck;
mod process;
mod report;
mod runner;

pub use config::*;
pub use diff::unified_diff;
pub use process::{resolve_program, run_captured, Captured, ExitOutcome};
pub use report::Report;
pub use runner::{run, run_suite, ExecutionResult, Status};
