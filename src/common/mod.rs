//! Common utilities shared by the CLI and the test runner

pub mod error;
pub mod logging;

pub use error::{Error, Result};

/// Render a command line for log and console output.
///
/// Arguments containing whitespace are quoted so the line can be pasted back
/// into a shell.
pub fn display_command(command: &[String]) -> String {
    command
        .iter()
        .map(|arg| {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                format!("'{}'", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
