//! Subprocess execution for external tools.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::error::{LinterError, LinterResult};
use crate::types::ToolOutput;

/// Default per-invocation timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs an external tool and captures its output.
#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    pub timeout: Duration,
    pub work_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl Default for SubprocessExecutor {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TOOL_TIMEOUT,
            work_dir: None,
            env: BTreeMap::new(),
        }
    }
}

impl SubprocessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `program args...`.
    ///
    /// Non-zero exits are returned as output. Spawn failures and timeouts
    /// are errors; a timed out child is killed.
    pub async fn execute(&self, program: &str, args: &[String]) -> LinterResult<ToolOutput> {
        let start = Instant::now();

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| LinterError::ExecutionFailed {
            tool: program.to_string(),
            reason: e.to_string(),
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| LinterError::Timeout {
                tool: program.to_string(),
                secs: self.timeout.as_secs(),
            })??;

        let duration_ms = start.elapsed().as_millis() as u64;
        let result = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms,
        };

        debug!(
            tool = %program,
            exit_code = result.exit_code,
            duration_ms = duration_ms,
            stdout = %truncate_for_log(&result.stdout),
            "tool finished"
        );

        Ok(result)
    }
}

/// First 500 chars of tool output, for debug logging.
pub fn truncate_for_log(text: &str) -> &str {
    match text.char_indices().nth(500) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
