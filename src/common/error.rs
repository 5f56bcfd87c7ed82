//! Error types for the lab test harness
//!
//! Only fatal conditions live here. Per-scenario problems (bad exit status,
//! output mismatch, timeouts, spawn failures) are recorded in the report and
//! never surface as an `Error`.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Suite Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid suite file: {0}")]
    SuiteParse(String),

    // === Build Errors ===
    #[error("Build in '{dir}' failed with {}", describe_code(.code))]
    BuildFailed { dir: String, code: Option<i32> },

    #[error("Failed to run build in '{dir}': {error}")]
    BuildSpawn { dir: String, error: String },

    // === Precondition Errors ===
    #[error("Preconditions not met:\n  {}", .0.join("\n  "))]
    Precondition(Vec<String>),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write report '{path}': {error}")]
    ReportWrite { path: String, error: String },
}

fn describe_code(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl Error {
    /// Create a build failure error
    pub fn build_failed(dir: &str, code: Option<i32>) -> Self {
        Self::BuildFailed {
            dir: dir.to_string(),
            code,
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
