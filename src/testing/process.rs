//! Child process invocation with merged output capture
//!
//! stdout and stderr of the child share one pipe, so the captured text keeps
//! the interleaving a terminal would show. Golden traces are recorded that way.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::task::{JoinError, JoinHandle};

/// How long to keep draining output after a timed-out child was killed.
/// Processes that left the child's group may still hold the write end of the
/// pipe.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// How the child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The child exited (or was terminated by a signal) on its own
    Exited(ExitStatus),
    /// The child was killed after running for the given limit
    TimedOut(Duration),
}

/// Output captured from one process run
#[derive(Debug, Clone)]
pub struct Captured {
    pub outcome: ExitOutcome,
    /// stdout and stderr, merged, lossily decoded as UTF-8
    pub output: String,
    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
}

impl Captured {
    /// Whether the process exited with status code zero
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ExitOutcome::Exited(status) if status.success())
    }
}

/// Resolve the program of a command line.
///
/// Programs containing a path separator (`./scanner`) are taken relative to
/// the working directory they will run in; bare names are looked up on `PATH`.
/// Returns `None` if the program does not exist.
pub fn resolve_program(program: &str, cwd: &Path) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        let candidate = cwd.join(program);
        if candidate.is_file() {
            // Absolute, so spawning does not depend on how current_dir is applied
            candidate.canonicalize().ok()
        } else {
            None
        }
    } else {
        which::which(program).ok()
    }
}

/// Run `program` with `args` in `cwd`, capturing merged stdout/stderr.
///
/// Blocks (asynchronously) until the child exits, or until `timeout` elapses
/// in which case the child and everything it started are killed. Output read
/// before the kill is kept. An `Err` means the process could not be started
/// or waited on; a non-zero exit is reported through [`ExitOutcome`].
pub async fn run_captured(
    program: &Path,
    args: &[String],
    cwd: &Path,
    timeout: Option<Duration>,
) -> io::Result<Captured> {
    let (reader, writer) = io::pipe()?;

    tracing::debug!(
        program = %program.display(),
        ?args,
        cwd = %cwd.display(),
        ?timeout,
        "Spawning process"
    );

    let started = Instant::now();
    // The command owns the parent's copies of the write end; it must be
    // dropped right after spawning or the reader never sees EOF.
    let mut child = {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer)
            .kill_on_drop(true);
        // Own process group, so a timeout can take down background children
        // that inherited the output pipe
        #[cfg(unix)]
        if timeout.is_some() {
            cmd.process_group(0);
        }
        cmd.spawn()?
    };
    let pid = child.id();

    let buffer = OutputBuffer::default();
    let mut drain = spawn_drain(reader, Arc::clone(&buffer))?;

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => ExitOutcome::Exited(status?),
            Err(_) => {
                tracing::warn!(
                    program = %program.display(),
                    "Process exceeded {:?}, killing it",
                    limit
                );
                kill_process_group(pid);
                child.kill().await?;
                ExitOutcome::TimedOut(limit)
            }
        },
        None => ExitOutcome::Exited(child.wait().await?),
    };
    let elapsed = started.elapsed();

    match outcome {
        ExitOutcome::Exited(_) => flatten_join((&mut drain).await)?,
        ExitOutcome::TimedOut(_) => match tokio::time::timeout(DRAIN_GRACE, &mut drain).await {
            Ok(joined) => {
                if let Err(e) = flatten_join(joined) {
                    tracing::warn!("Reading output after kill failed: {}", e);
                }
            }
            Err(_) => {
                tracing::warn!("Output pipe still open after kill, keeping partial output");
                drain.abort();
            }
        },
    }
    let bytes = std::mem::take(&mut *lock(&buffer));

    tracing::debug!(
        program = %program.display(),
        ?outcome,
        bytes = bytes.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Process finished"
    );

    Ok(Captured {
        outcome,
        output: String::from_utf8_lossy(&bytes).into_owned(),
        elapsed,
    })
}

/// Output read from the child so far
type OutputBuffer = Arc<Mutex<Vec<u8>>>;

fn lock(buffer: &OutputBuffer) -> MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read the pipe to EOF on the runtime, so the task can be aborted
#[cfg(unix)]
fn spawn_drain(reader: io::PipeReader, buffer: OutputBuffer) -> io::Result<JoinHandle<io::Result<()>>> {
    use std::os::fd::OwnedFd;
    use tokio::io::AsyncReadExt;

    let mut pipe = tokio::net::unix::pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    Ok(tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            let n = pipe.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            lock(&buffer).extend_from_slice(&chunk[..n]);
        }
    }))
}

/// Blocking fallback; an aborted drain keeps its thread until the pipe closes
#[cfg(not(unix))]
fn spawn_drain(mut reader: io::PipeReader, buffer: OutputBuffer) -> io::Result<JoinHandle<io::Result<()>>> {
    use std::io::Read;

    Ok(tokio::task::spawn_blocking(move || {
        let mut chunk = [0u8; 8192];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            lock(&buffer).extend_from_slice(&chunk[..n]);
        }
    }))
}

/// SIGKILL the process group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    // Negative pid addresses the whole group
    let result = unsafe { libc::kill(-(pid as i32), libc::SIGKILL) };
    if result != 0 {
        tracing::debug!(pid, "Process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn flatten_join(joined: std::result::Result<io::Result<()>, JoinError>) -> io::Result<()> {
    joined.map_err(io::Error::other)?
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    fn shell() -> PathBuf {
        resolve_program("sh", Path::new(".")).expect("sh on PATH")
    }

    #[tokio::test]
    async fn test_merges_stdout_and_stderr_in_order() {
        let captured = run_captured(
            &shell(),
            &sh("echo one; echo two 1>&2; echo three"),
            Path::new("."),
            None,
        )
        .await
        .unwrap();

        assert!(captured.succeeded());
        assert_eq!(captured.output, "one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn test_reports_non_zero_exit() {
        let captured = run_captured(&shell(), &sh("echo failing; exit 3"), Path::new("."), None)
            .await
            .unwrap();

        assert!(!captured.succeeded());
        match captured.outcome {
            ExitOutcome::Exited(status) => assert_eq!(status.code(), Some(3)),
            other => panic!("Expected exit, got {:?}", other),
        }
        assert_eq!(captured.output, "failing\n");
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here\n").unwrap();

        let captured = run_captured(&shell(), &sh("cat marker.txt"), dir.path(), None)
            .await
            .unwrap();

        assert_eq!(captured.output, "here\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let captured = run_captured(
            &shell(),
            &sh("echo started; exec sleep 30"),
            Path::new("."),
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap();

        assert_eq!(
            captured.outcome,
            ExitOutcome::TimedOut(Duration::from_millis(200))
        );
        assert!(!captured.succeeded());
        assert!(captured.elapsed < Duration::from_secs(10));
        assert_eq!(captured.output, "started\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let started = Instant::now();
        let captured = run_captured(
            &shell(),
            &sh("echo started; sleep 30 & exec sleep 30"),
            Path::new("."),
            Some(Duration::from_millis(300)),
        )
        .await
        .unwrap();

        assert_eq!(
            captured.outcome,
            ExitOutcome::TimedOut(Duration::from_millis(300))
        );
        // The backgrounded sleep holds the pipe open unless its group is killed
        assert!(started.elapsed() < DRAIN_GRACE);
        assert_eq!(captured.output, "started\n");
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let result = run_captured(
            Path::new("/nonexistent/program"),
            &[],
            Path::new("."),
            None,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_program() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tool"), "#!/bin/sh\n").unwrap();

        let resolved = resolve_program("./tool", dir.path()).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("tool"));

        assert!(resolve_program("./missing", dir.path()).is_none());
        assert!(resolve_program("sh", dir.path()).is_some());
        assert!(resolve_program("definitely-not-a-real-program-xyz", dir.path()).is_none());
    }
}
