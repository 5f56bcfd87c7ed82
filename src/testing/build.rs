//! Build phase
//!
//! Every sub-project is built once before any scenario runs. A failing build
//! aborts the whole run; it is never reported as a test failure.

use std::process::Stdio;

use colored::Colorize;
use tokio::process::Command as TokioCommand;

use super::config::BuildStep;
use super::process::resolve_program;
use crate::common::{display_command, Error, Result};

/// Run all build steps in order, stopping at the first failure
pub async fn build_all(steps: &[BuildStep], verbose: bool) -> Result<()> {
    if steps.is_empty() {
        return Ok(());
    }

    println!("\n{}", "Build:".cyan());
    for step in steps {
        build(step, verbose).await?;
    }
    Ok(())
}

/// Run one build step in its sub-project directory.
///
/// The build's own output goes straight to the console.
pub async fn build(step: &BuildStep, verbose: bool) -> Result<()> {
    let dir = step.dir.display().to_string();
    let command = display_command(&step.command);

    if !step.dir.is_dir() {
        return Err(Error::BuildSpawn {
            dir,
            error: "directory does not exist".to_string(),
        });
    }

    let name = step.command.first().map(String::as_str).unwrap_or_default();
    let program = resolve_program(name, &step.dir).ok_or_else(|| Error::BuildSpawn {
        dir: dir.clone(),
        error: format!("program '{}' not found", name),
    })?;

    if verbose {
        println!("  $ {}", format!("(cd {} && {})", dir, command).dimmed());
    }
    tracing::info!(dir = %dir, command = %command, "Building");

    let status = TokioCommand::new(&program)
        .args(step.command.get(1..).unwrap_or_default())
        .current_dir(&step.dir)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| Error::BuildSpawn {
            dir: dir.clone(),
            error: e.to_string(),
        })?;

    if !status.success() {
        println!("  {} {}", "✗".red(), dir);
        return Err(Error::build_failed(&dir, status.code()));
    }

    println!("  {} {}", "✓".green(), dir.dimmed());
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn step(dir: &std::path::Path, script: &str) -> BuildStep {
        BuildStep {
            dir: dir.to_path_buf(),
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        }
    }

    #[tokio::test]
    async fn test_build_runs_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        build(&step(dir.path(), "touch built"), false).await.unwrap();
        assert!(dir.path().join("built").exists());
    }

    #[tokio::test]
    async fn test_failing_build_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = build(&step(dir.path(), "exit 2"), false).await.unwrap_err();
        assert!(matches!(err, Error::BuildFailed { code: Some(2), .. }));
    }

    #[tokio::test]
    async fn test_build_all_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let steps = vec![
            step(dir.path(), "touch first"),
            step(dir.path(), "exit 1"),
            step(dir.path(), "touch third"),
        ];

        assert!(build_all(&steps, false).await.is_err());
        assert!(dir.path().join("first").exists());
        assert!(!dir.path().join("third").exists());
    }

    #[tokio::test]
    async fn test_missing_directory_or_program() {
        let dir = tempfile::tempdir().unwrap();

        let err = build(&step(&dir.path().join("nope"), "true"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BuildSpawn { .. }));

        let missing = BuildStep {
            dir: dir.path().to_path_buf(),
            command: vec!["./no-such-build-script".to_string()],
        };
        let err = build(&missing, false).await.unwrap_err();
        assert!(err.to_string().contains("no-such-build-script"));
    }
}
