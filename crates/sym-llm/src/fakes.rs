//! In-memory provider fake (testing only).
//!
//! [`ScriptedProvider`] answers prompts from a script keyed by substring,
//! falls back to a default reply, and records every prompt it receives.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{LlmError, LlmResult};
use crate::parse::parse_response;
use crate::provider::{ExecutionMode, Provider, ProviderInfo, ProviderProfile, ResponseFormat};

/// Scripted LLM provider.
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    mode: Option<ExecutionMode>,
    profile: ProviderProfile,
    /// `(needle, reply)`: the first needle contained in the prompt wins.
    replies: Vec<(String, String)>,
    default_reply: String,
    fail_when: Vec<String>,
    always_fail: bool,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    /// A parallel-API provider replying "no violation" to everything.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: Some(ExecutionMode::ParallelApi),
            profile: ProviderProfile::PARALLEL_API,
            replies: Vec::new(),
            default_reply: r#"{"violates": false, "confidence": "high"}"#.to_string(),
            fail_when: Vec::new(),
            always_fail: false,
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_mode(mut self, mode: Option<ExecutionMode>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Reply with `reply` when the prompt contains `needle`.
    pub fn reply_when(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.push((needle.into(), reply.into()));
        self
    }

    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    /// Fail when the prompt contains `needle`.
    pub fn fail_when(mut self, needle: impl Into<String>) -> Self {
        self.fail_when.push(needle.into());
        self
    }

    pub fn failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name.clone(),
            display_name: format!("Scripted ({})", self.name),
            mode: self.mode,
            profile: self.profile,
        }
    }

    async fn execute(&self, prompt: &str, format: ResponseFormat) -> LlmResult<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.always_fail || self.fail_when.iter().any(|n| prompt.contains(n.as_str())) {
            return Err(LlmError::Request(format!("{} scripted failure", self.name)));
        }

        let reply = self
            .replies
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.as_str())
            .unwrap_or(&self.default_reply);
        Ok(parse_response(reply, format))
    }
}
