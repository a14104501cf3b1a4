//! External analysis script invocation.
//!
//! Each script runs as `<interpreter> <script>` with stdin closed. Stdout
//! and stderr are captured into separate bounded buffers and the stdout
//! buffer is parsed as JSON once the process exits successfully.
//!
//! The child is spawned with `kill_on_drop`, so dropping the future that
//! owns it (client disconnect, deadline, a failing sibling) terminates it.

use crate::config::AnalysisConfig;
use serde_json::Value;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Errors raised while running an analysis script.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The process could not be started.
    #[error("failed to start {program} {script}: {source}")]
    Spawn {
        program: String,
        script: String,
        #[source]
        source: io::Error,
    },

    /// Reading the process output or waiting on it failed.
    #[error("I/O error while running {script}: {source}")]
    Io {
        script: String,
        #[source]
        source: io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("script {script} exited with {status}: {stderr}")]
    Failed {
        script: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The process exited successfully but only wrote diagnostics.
    #[error("script {script} ran successfully but produced no data. Stderr: {stderr}")]
    SilentFailure { script: String, stderr: String },

    /// Stdout was not valid JSON.
    #[error("failed to parse JSON from {script}: {reason}. Raw output: {raw}")]
    Malformed {
        script: String,
        reason: String,
        raw: String,
    },

    /// The process did not finish before the deadline.
    #[error("script {script} did not finish within {timeout:?}")]
    TimedOut { script: String, timeout: Duration },

    /// An output stream exceeded the capture limit.
    #[error("script {script} wrote more than {limit} bytes to {stream}")]
    OutputTooLarge {
        script: String,
        stream: &'static str,
        limit: usize,
    },
}

/// Runs analysis scripts under a fixed interpreter.
#[derive(Debug, Clone)]
pub struct ScriptInvoker {
    interpreter: String,
    timeout: Duration,
    max_output_bytes: usize,
}

impl ScriptInvoker {
    /// Create an invoker.
    pub fn new(interpreter: impl Into<String>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
            max_output_bytes,
        }
    }

    /// Create an invoker from the analysis settings.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.interpreter.clone(),
            config.timeout(),
            config.max_output_bytes,
        )
    }

    /// Run `script` to completion and return its parsed output.
    pub async fn run(&self, script: &Path) -> Result<Value, InvokeError> {
        let label = script.display().to_string();
        debug!("Starting {} {}", self.interpreter, label);

        let mut child = Command::new(&self.interpreter)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvokeError::Spawn {
                program: self.interpreter.clone(),
                script: label.clone(),
                source,
            })?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                return Err(InvokeError::Io {
                    script: label,
                    source: io::Error::new(io::ErrorKind::BrokenPipe, "output pipes unavailable"),
                })
            }
        };

        let limit = self.max_output_bytes;
        let io_error = |source| InvokeError::Io {
            script: label.clone(),
            source,
        };
        let collect = async {
            futures::try_join!(
                read_bounded(stdout, limit, "stdout", &label),
                read_bounded(stderr, limit, "stderr", &label),
                async { child.wait().await.map_err(io_error) },
            )
        };

        let outcome = tokio::time::timeout(self.timeout, collect).await;
        let (out, err, status) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                warn!("{} exceeded its {:?} deadline, killing it", label, self.timeout);
                return Err(InvokeError::TimedOut {
                    script: label,
                    timeout: self.timeout,
                });
            }
        };

        debug!(
            "{} finished with {} ({} bytes stdout, {} bytes stderr)",
            label,
            status,
            out.len(),
            err.len()
        );

        interpret(&label, status, &out, &err)
    }
}

/// Read a stream to EOF, failing once more than `limit` bytes arrive.
async fn read_bounded<R>(
    reader: R,
    limit: usize,
    stream: &'static str,
    script: &str,
) -> Result<Vec<u8>, InvokeError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .map_err(|source| InvokeError::Io {
            script: script.to_string(),
            source,
        })?;

    if buf.len() > limit {
        return Err(InvokeError::OutputTooLarge {
            script: script.to_string(),
            stream,
            limit,
        });
    }

    Ok(buf)
}

/// Apply the completion policy to a finished process.
fn interpret(
    script: &str,
    status: ExitStatus,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<Value, InvokeError> {
    let diagnostics = String::from_utf8_lossy(stderr).into_owned();

    if !status.success() {
        return Err(InvokeError::Failed {
            script: script.to_string(),
            status,
            stderr: diagnostics,
        });
    }

    // Compatibility rule: an exit-0 run that only wrote to stderr is treated
    // as a failure. It dates from one flaky script and is not a general
    // contract for analysis processes.
    if stdout.is_empty() && !diagnostics.is_empty() {
        return Err(InvokeError::SilentFailure {
            script: script.to_string(),
            stderr: diagnostics,
        });
    }

    serde_json::from_slice(stdout).map_err(|e| InvokeError::Malformed {
        script: script.to_string(),
        reason: e.to_string(),
        raw: String::from_utf8_lossy(stdout).into_owned(),
    })
}
