//! Agent CLI provider: a local command that reads the prompt on stdin and
//! writes the reply to stdout.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::parse::parse_response;
use crate::provider::{ExecutionMode, Provider, ProviderInfo, ProviderProfile, ResponseFormat};

#[derive(Debug, Clone)]
pub struct CliProvider {
    name: String,
    program: String,
    args: Vec<String>,
    mode: ExecutionMode,
    profile: ProviderProfile,
}

impl CliProvider {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            mode: ExecutionMode::AgenticSingle,
            profile: ProviderProfile::AGENTIC_CLI,
        }
    }

    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }
}

#[async_trait]
impl Provider for CliProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name.clone(),
            display_name: format!("{} CLI", self.name),
            mode: Some(self.mode),
            profile: self.profile,
        }
    }

    async fn execute(&self, prompt: &str, format: ResponseFormat) -> LlmResult<String> {
        debug!(provider = %self.name, prompt_chars = prompt.len(), "invoking agent cli");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LlmError::Process(format!("failed to start {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| LlmError::Process(format!("failed to write prompt: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| LlmError::Process(e.to_string()))?;

        if !output.status.success() {
            return Err(LlmError::Process(format!(
                "{} exited with {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let reply = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(provider = %self.name, response_chars = reply.len(), "agent cli replied");
        Ok(parse_response(&reply, format))
    }
}
