//! Precondition check
//!
//! Verifies the filesystem state the scenarios depend on (working
//! directories, built programs, golden traces) before anything runs, so a
//! missing build artifact is reported once and up front instead of as a
//! string of scenario errors.

use super::config::Suite;
use super::process::resolve_program;
use crate::common::{Error, Result};

/// Check every scenario; all problems are collected into one error
pub fn check(suite: &Suite) -> Result<()> {
    let problems = problems(suite);
    if problems.is_empty() {
        tracing::debug!(scenarios = suite.scenarios.len(), "Preconditions met");
        Ok(())
    } else {
        Err(Error::Precondition(problems))
    }
}

/// Human-readable list of unmet preconditions, in scenario order
pub fn problems(suite: &Suite) -> Vec<String> {
    let mut problems = Vec::new();

    for scenario in &suite.scenarios {
        if !scenario.cwd.is_dir() {
            problems.push(format!(
                "{}: working directory '{}' does not exist",
                scenario.name,
                scenario.cwd.display()
            ));
        } else if resolve_program(scenario.program(), &scenario.cwd).is_none() {
            problems.push(format!(
                "{}: program '{}' not found in '{}'",
                scenario.name,
                scenario.program(),
                scenario.cwd.display()
            ));
        }

        if !scenario.expected.is_file() {
            problems.push(format!(
                "{}: golden file '{}' does not exist",
                scenario.name,
                scenario.expected.display()
            ));
        }
    }

    problems
}
