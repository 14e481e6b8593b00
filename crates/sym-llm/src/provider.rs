//! The [`Provider`] capability and its metadata.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sym_core::ProviderOverrides;

use crate::error::LlmResult;

pub use sym_core::ExecutionMode;

/// Expected shape of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Text,
    Json,
}

/// Call limits for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub max_prompt_chars: usize,
    pub default_timeout_secs: u64,
    pub max_retries: u32,
}

impl ProviderProfile {
    pub const PARALLEL_API: ProviderProfile = ProviderProfile {
        max_prompt_chars: 8000,
        default_timeout_secs: 60,
        max_retries: 2,
    };

    pub const AGENTIC_CLI: ProviderProfile = ProviderProfile {
        max_prompt_chars: 100_000,
        default_timeout_secs: 300,
        max_retries: 0,
    };

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// This profile with any configured limits applied.
    pub fn with_overrides(self, overrides: &ProviderOverrides) -> Self {
        Self {
            max_prompt_chars: overrides.max_prompt_chars.unwrap_or(self.max_prompt_chars),
            default_timeout_secs: overrides.timeout_secs.unwrap_or(self.default_timeout_secs),
            max_retries: overrides.max_retries.unwrap_or(self.max_retries),
        }
    }
}

/// Provider metadata used to pick a batching strategy and size prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub display_name: String,
    /// `None` when the provider does not declare a mode.
    pub mode: Option<ExecutionMode>,
    pub profile: ProviderProfile,
}

/// An LLM backend.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn info(&self) -> ProviderInfo;

    /// Send `prompt` and return the reply. For [`ResponseFormat::Json`] the
    /// reply is narrowed to its JSON payload when one can be found.
    async fn execute(&self, prompt: &str, format: ResponseFormat) -> LlmResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serde_names() {
        assert_eq!(
            serde_json::to_string(&ExecutionMode::AgenticSingle).unwrap(),
            "\"agentic-single\""
        );
        let mode: ExecutionMode = serde_json::from_str("\"parallel-api\"").unwrap();
        assert_eq!(mode, ExecutionMode::ParallelApi);
        assert_eq!(ExecutionMode::ParallelApi.to_string(), "parallel-api");
    }

    #[test]
    fn test_overrides_replace_only_given_limits() {
        let profile = ProviderProfile::AGENTIC_CLI.with_overrides(&ProviderOverrides {
            max_prompt_chars: Some(4000),
            ..ProviderOverrides::default()
        });
        assert_eq!(profile.max_prompt_chars, 4000);
        assert_eq!(profile.default_timeout_secs, 300);
        assert_eq!(profile.max_retries, 0);
    }

    #[test]
    fn test_profiles() {
        assert_eq!(ProviderProfile::PARALLEL_API.max_prompt_chars, 8000);
        assert_eq!(ProviderProfile::AGENTIC_CLI.timeout(), Duration::from_secs(300));
    }
}
