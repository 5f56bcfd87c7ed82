//! labtest - golden-trace test harness for the compiler labs
//!
//! Builds the lab sub-projects, runs each lab binary against its test
//! program, compares the output with the recorded trace and writes a JUnit
//! XML report.

use clap::Parser;
use labtest::{cli, commands::Commands, common::logging};

#[derive(Parser)]
#[command(name = "labtest", about = "Golden-trace test harness for the compiler labs")]
#[command(version, long_about = None)]
struct Cli {
    /// Print commands and failure details
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    let command = cli.command.unwrap_or_default();
    if let Err(e) = cli::dispatch(command, cli.verbose).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
