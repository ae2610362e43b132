//! Report-generation script invoker.
//!
//! Runs `<interpreter> <interpreter args...> <script>` to completion,
//! capturing stdout/stderr. A zero exit code is the only success signal;
//! everything else, including spawn failures and timeouts, is a
//! [`ReportError`].

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::config::ReportSettings;

/// Maximum stdout or stderr size captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Captured output from a successful script run.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Errors that can occur while running the report script.
#[derive(Debug)]
pub enum ReportError {
    /// The script file does not exist.
    NotFound(PathBuf),
    /// The interpreter could not be spawned or waited on.
    Spawn(std::io::Error),
    /// The script exceeded its configured timeout and was killed.
    Timeout { elapsed_ms: u64 },
    /// The script ran but exited with a non-zero exit code.
    ExecutionFailed { exit_code: i32, stderr: String },
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Report script not found: {}", path.display()),
            Self::Spawn(err) => write!(f, "Failed to launch report script: {err}"),
            Self::Timeout { elapsed_ms } => {
                write!(f, "Report script timed out after {elapsed_ms}ms")
            }
            Self::ExecutionFailed { exit_code, stderr } => {
                write!(f, "Report script failed with exit code {exit_code}: {stderr}")
            }
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

/// The external report-generation step.
#[derive(Debug, Clone)]
pub struct ReportScript {
    settings: ReportSettings,
}

impl ReportScript {
    pub fn new(settings: ReportSettings) -> Self {
        Self { settings }
    }

    /// Run the script and wait for it to exit.
    pub async fn run(&self) -> Result<ReportOutput, ReportError> {
        let script = &self.settings.script_path;
        if tokio::fs::metadata(script).await.is_err() {
            return Err(ReportError::NotFound(script.clone()));
        }

        tracing::info!(
            interpreter = %self.settings.interpreter,
            script = %script.display(),
            "Running report script",
        );

        let mut cmd = Command::new(&self.settings.interpreter);
        cmd.args(&self.settings.interpreter_args)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(ReportError::Spawn)?;

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
        let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

        let status = match self.settings.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited.map_err(ReportError::Spawn)?,
                // `child` is dropped on return, which kills it.
                Err(_) => {
                    return Err(ReportError::Timeout {
                        elapsed_ms: elapsed_ms(start),
                    })
                }
            },
            None => child.wait().await.map_err(ReportError::Spawn)?,
        };

        let stdout = String::from_utf8_lossy(&stdout_task.await.unwrap_or_default()).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_task.await.unwrap_or_default()).into_owned();
        let duration_ms = elapsed_ms(start);

        if !status.success() {
            return Err(ReportError::ExecutionFailed {
                exit_code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        tracing::info!(duration_ms, "Report script executed successfully");
        Ok(ReportOutput {
            stdout,
            stderr,
            duration_ms,
        })
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
