//! Test runner implementation
//!
//! Runs scenarios one at a time, classifies each by exit status against its
//! expectation and, where the exit status matched, compares the captured
//! output with the golden trace.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use colored::Colorize;

use super::config::{Scenario, Suite};
use super::diff::unified_diff;
use super::process::{resolve_program, run_captured, ExitOutcome};
use super::report::Report;
use crate::common::display_command;

/// Outcome of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    /// Expected to succeed, exited non-zero (or could not be run)
    UnexpectedError,
    /// Expected to fail, exited zero
    UnexpectedSuccess,
    /// Exit status as expected, output differs from the golden trace
    OutputMismatch,
    /// Killed after exceeding its timeout
    TimedOut(Duration),
}

impl Status {
    pub fn is_passed(&self) -> bool {
        matches!(self, Status::Passed)
    }

    /// Whether the report lists this as a JUnit `<error>` rather than a
    /// `<failure>`
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Status::UnexpectedError | Status::UnexpectedSuccess | Status::TimedOut(_)
        )
    }

    /// Message carried by the JUnit error/failure element
    pub fn message(&self) -> Option<String> {
        match self {
            Status::Passed => None,
            Status::UnexpectedError => {
                Some("Error: Processes returned with non-zero status code".to_string())
            }
            Status::UnexpectedSuccess => {
                Some("Error: Processes did not return with non-zero status code".to_string())
            }
            Status::OutputMismatch => Some("Unexpected output".to_string()),
            Status::TimedOut(limit) => Some(format!(
                "Error: Process timed out after {} seconds",
                limit.as_secs_f64()
            )),
        }
    }
}

/// Result of running one scenario. Created once, never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub name: String,
    pub classname: String,
    pub elapsed: Duration,
    /// Merged stdout/stderr of the command
    pub output: String,
    pub status: Status,
    /// Diff text for output mismatches; the I/O error when the scenario could
    /// not be run or compared
    pub detail: Option<String>,
}

impl ExecutionResult {
    fn new(scenario: &Scenario, elapsed: Duration, output: String, status: Status) -> Self {
        Self {
            name: scenario.name.clone(),
            classname: scenario.classname().to_string(),
            elapsed,
            output,
            status,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Run a single scenario. Never fails: every problem becomes part of the result.
pub async fn run(scenario: &Scenario, suite: &Suite) -> ExecutionResult {
    let cwd = &scenario.cwd;
    let program = resolve_program(scenario.program(), cwd)
        .unwrap_or_else(|| cwd.join(scenario.program()));
    let timeout = suite.timeout_for(scenario);

    let started = Instant::now();
    let captured = match run_captured(&program, scenario.args(), cwd, timeout).await {
        Ok(captured) => captured,
        Err(e) => {
            tracing::warn!(scenario = %scenario.name, "Failed to run command: {}", e);
            return ExecutionResult::new(
                scenario,
                started.elapsed(),
                String::new(),
                Status::UnexpectedError,
            )
            .with_detail(format!(
                "Failed to run '{}' in '{}': {}",
                display_command(&scenario.command),
                cwd.display(),
                e
            ));
        }
    };

    let succeeded = match captured.outcome {
        ExitOutcome::TimedOut(limit) => {
            return ExecutionResult::new(
                scenario,
                captured.elapsed,
                captured.output,
                Status::TimedOut(limit),
            );
        }
        ExitOutcome::Exited(_) => captured.succeeded(),
    };

    let result = |status| ExecutionResult::new(scenario, captured.elapsed, captured.output.clone(), status);

    match (succeeded, scenario.expect_failure) {
        (false, false) => result(Status::UnexpectedError),
        (true, true) => result(Status::UnexpectedSuccess),
        (false, true) if !suite.compare_failure_output => result(Status::Passed),
        _ => match compare_with_golden(&scenario.name, &captured.output, &scenario.expected) {
            Ok(None) => result(Status::Passed),
            Ok(Some(diff)) => result(Status::OutputMismatch).with_detail(diff),
            Err(e) => {
                tracing::warn!(scenario = %scenario.name, "Comparison failed: {}", e);
                result(Status::UnexpectedError).with_detail(format!(
                    "Failed to compare output with '{}': {}",
                    scenario.expected.display(),
                    e
                ))
            }
        },
    }
}

/// Write `output` to a private scratch file and diff it against the golden
/// trace. Returns the diff text on mismatch.
fn compare_with_golden(name: &str, output: &str, golden: &Path) -> std::io::Result<Option<String>> {
    let mut scratch = tempfile::Builder::new()
        .prefix("labtest-")
        .suffix(".out")
        .tempfile()?;
    scratch.write_all(output.as_bytes())?;
    scratch.flush()?;

    let actual = std::fs::read_to_string(scratch.path())?;
    let expected = std::fs::read_to_string(golden)?;

    tracing::debug!(
        scenario = name,
        golden = %golden.display(),
        scratch = %scratch.path().display(),
        "Comparing output"
    );

    // Labels stay stable across runs so reports are reproducible
    Ok(unified_diff(
        &expected,
        &actual,
        &golden.display().to_string(),
        &format!("{} (actual)", name),
    ))
}

/// Run every scenario of the suite in declaration order.
///
/// Prints one line per scenario; with `verbose`, failure details too.
pub async fn run_suite(suite: &Suite, verbose: bool) -> Report {
    println!(
        "\n{} {}",
        "Running Suite:".blue().bold(),
        suite.name.white().bold()
    );
    println!("\n{}", "Scenarios:".cyan());

    let mut results = Vec::with_capacity(suite.scenarios.len());
    for scenario in &suite.scenarios {
        if verbose {
            println!(
                "  $ {}",
                format!(
                    "(cd {} && {})",
                    scenario.cwd.display(),
                    display_command(&scenario.command)
                )
                .dimmed()
            );
        }

        let result = run(scenario, suite).await;
        print_result(&result, verbose);
        results.push(result);
    }

    let report = Report::new(&suite.name, results);

    let summary = format!(
        "{} passed, {} failed, {} errors",
        report.passed(),
        report.failures(),
        report.errors()
    );
    if report.all_passed() {
        println!("\n{} {}\n", "✓".green().bold(), summary.green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), summary.red().bold());
    }

    report
}

fn print_result(result: &ExecutionResult, verbose: bool) {
    let elapsed = format!("({:.2}s)", result.elapsed.as_secs_f64()).dimmed();
    match result.status.message() {
        None => println!("  {} {} {}", "✓".green(), result.name, elapsed),
        Some(message) => {
            println!("  {} {} {} {}", "✗".red(), result.name, elapsed, message);
            if verbose {
                let body = result.detail.as_deref().unwrap_or(&result.output);
                for line in body.trim_end().lines() {
                    println!("      {}", line.dimmed());
                }
            }
        }
    }
}
