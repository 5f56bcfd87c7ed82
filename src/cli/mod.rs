//! CLI command handling
//!
//! Dispatches CLI commands to the test runner and formats console output.

use colored::Colorize;

use crate::commands::{Commands, SuiteArgs};
use crate::common::{display_command, Result};
use crate::testing::{build, precheck, run_suite, Suite};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, verbose: bool) -> Result<()> {
    match command {
        Commands::Run {
            suite,
            output,
            skip_build,
        } => {
            let suite = load_suite(&suite)?;

            if skip_build {
                tracing::info!("Skipping build steps");
            } else {
                build::build_all(&suite.builds, verbose).await?;
            }
            precheck::check(&suite)?;

            let report = run_suite(&suite, verbose).await;
            let path = output.unwrap_or_else(|| suite.output.clone());
            report.write_to(&path)?;

            println!("Report written to {}", path.display());
            Ok(())
        }

        Commands::List { suite } => {
            let suite = load_suite(&suite)?;

            println!("{} ({} scenarios)", suite.name.bold(), suite.scenarios.len());
            for scenario in &suite.scenarios {
                let marker = if scenario.expect_failure {
                    " [expect failure]".yellow().to_string()
                } else {
                    String::new()
                };
                println!(
                    "  {:<10} {:<8} {}{}",
                    scenario.name,
                    scenario.classname(),
                    display_command(&scenario.command),
                    marker
                );
                if verbose {
                    println!(
                        "  {:<10} {:<8} cwd: {}  trace: {}",
                        "",
                        "",
                        scenario.cwd.display(),
                        scenario.expected.display()
                    );
                }
            }
            Ok(())
        }

        Commands::Check { suite } => {
            let suite = load_suite(&suite)?;
            precheck::check(&suite)?;
            println!(
                "{} All {} scenarios ready",
                "✓".green(),
                suite.scenarios.len()
            );
            Ok(())
        }
    }
}

fn load_suite(args: &SuiteArgs) -> Result<Suite> {
    match &args.suite {
        Some(path) => Suite::load(path),
        None => Suite::builtin(),
    }
}
