//! External process execution with captured output and a hard timeout.
//!
//! Children are spawned with `kill_on_drop(true)`: when the future driving [`run_captured`] is
//! dropped (timeout, or the HTTP client went away and the request future was cancelled) the
//! child is killed instead of being left running.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub success: bool,
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    /// Stderr if it has content, else stdout.
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("executable '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to start '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for '{}': {source}", .program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' timed out after {} seconds (PID: {pid:?})", .program.display(), .timeout.as_secs())]
    TimedOut {
        program: PathBuf,
        timeout: Duration,
        pid: Option<u32>,
    },
}

/// Run `program` with `args`, capturing stdout and stderr, for at most `limit`.
///
/// A non-zero exit status is not an error here; callers inspect [`CapturedOutput::success`].
pub async fn run_captured<I, S>(program: &Path, args: I, limit: Duration) -> Result<CapturedOutput, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProcessError::NotFound(program.to_path_buf())
            } else {
                ProcessError::Spawn {
                    program: program.to_path_buf(),
                    source,
                }
            }
        })?;

    let pid = child.id();

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(ProcessError::Wait {
                program: program.to_path_buf(),
                source,
            });
        }
        Err(_) => {
            // wait_with_output was cancelled; dropping the child kills it
            return Err(ProcessError::TimedOut {
                program: program.to_path_buf(),
                timeout: limit,
                pid,
            });
        }
    };

    Ok(CapturedOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_stderr() {
        let output = run_captured(
            Path::new("/bin/sh"),
            ["-c", "echo out; echo err >&2"],
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert!(output.success);
        assert_eq!(output.code, Some(0));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.diagnostics().trim(), "err");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let output = run_captured(Path::new("/bin/sh"), ["-c", "echo nope; exit 3"], Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.diagnostics().trim(), "nope");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run_captured(
            Path::new("/nonexistent/bin/tool"),
            ["--version"],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProcessError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let started = std::time::Instant::now();
        let err = run_captured(Path::new("/bin/sh"), ["-c", "sleep 30"], Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
