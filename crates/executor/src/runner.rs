//! Bounded process runner.
//!
//! Executes the materialized command line with a hard timeout. A timeout
//! or non-zero exit is an observation for the planner, never a crash of
//! the mission loop.

use overwatch_core::error::ExecutorError;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of one command invocation.
#[derive(Debug, Clone)]
pub struct RawOutput {
    /// Merged stdout/stderr text, operator-readable.
    pub text: String,
    /// Exit status was zero.
    pub success: bool,
    /// The command was cut off at the timeout bound.
    pub timed_out: bool,
}

/// Executes command lines under a timeout bound.
pub struct CommandRunner {
    timeout_secs: u64,
}

impl CommandRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// Run the given line via `sh -c`, capturing both streams.
    pub async fn run(&self, line: &str) -> Result<RawOutput, ExecutorError> {
        debug!(command = %line, timeout_secs = self.timeout_secs, "Executing command");

        let output_future = if cfg!(target_os = "windows") {
            Command::new("cmd").args(["/C", line]).output()
        } else {
            Command::new("sh").args(["-c", line]).output()
        };

        let timeout = std::time::Duration::from_secs(self.timeout_secs);
        let output = match tokio::time::timeout(timeout, output_future).await {
            Ok(result) => result.map_err(|e| ExecutorError::Spawn {
                command: line.to_string(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                warn!(command = %line, "Command timed out");
                return Ok(RawOutput {
                    text: format!("[timed out after {}s]", self.timeout_secs),
                    success: false,
                    timed_out: true,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let success = output.status.success();

        let text = if success {
            if stderr.is_empty() {
                stdout
            } else {
                format!("{stdout}\n[stderr]: {stderr}")
            }
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %line, exit_code = code, "Command failed");
            format!("[exit code: {code}]\n{stdout}\n{stderr}")
        };

        Ok(RawOutput {
            text: text.trim().to_string(),
            success,
            timed_out: false,
        })
    }
}
