//! CLI command definitions
//!
//! Defines the clap commands for the lab test harness.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Build the labs, run every scenario and write the JUnit report (default)
    Run {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Report path (default: the suite's `output`, usually output.xml)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Do not run the build steps before testing
        #[arg(long)]
        skip_build: bool,
    },

    /// List the scenarios of a suite without running them
    List {
        #[command(flatten)]
        suite: SuiteArgs,
    },

    /// Verify working directories, programs and golden files exist
    Check {
        #[command(flatten)]
        suite: SuiteArgs,
    },
}

#[derive(Args, Default)]
pub struct SuiteArgs {
    /// YAML suite file (default: the built-in compiler lab suite)
    #[arg(long, short)]
    pub suite: Option<PathBuf>,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run {
            suite: SuiteArgs::default(),
            output: None,
            skip_build: false,
        }
    }
}
