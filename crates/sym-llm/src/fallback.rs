//! Ordered provider chain presented as a single [`Provider`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::controls::{execute_with_controls, ExecutionControls};
use crate::error::{LlmError, LlmResult};
use crate::parse::truncate_chars;
use crate::provider::{Provider, ProviderInfo, ResponseFormat};

/// Tries providers in priority order until one succeeds.
///
/// Each provider is called under its own profile's timeout and retry
/// budget, and receives the prompt cut to its own `max_prompt_chars`.
/// The chain reports the first provider's metadata.
pub struct FallbackProvider {
    providers: Vec<Arc<dyn Provider>>,
    backoff_base: Duration,
}

impl FallbackProvider {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> LlmResult<Self> {
        if providers.is_empty() {
            return Err(LlmError::NotConfigured);
        }
        Ok(Self {
            providers,
            backoff_base: Duration::from_millis(500),
        })
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        self.providers[0].name()
    }

    fn info(&self) -> ProviderInfo {
        self.providers[0].info()
    }

    async fn execute(&self, prompt: &str, format: ResponseFormat) -> LlmResult<String> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let profile = provider.info().profile;
            let bounded = truncate_chars(prompt, profile.max_prompt_chars);
            if bounded.len() < prompt.len() {
                debug!(
                    provider = %provider.name(),
                    prompt_chars = prompt.len(),
                    max_prompt_chars = profile.max_prompt_chars,
                    "truncating prompt for provider"
                );
            }
            let controls = ExecutionControls::from_profile(&profile).with_backoff(self.backoff_base);
            let result = execute_with_controls(provider.name(), &controls, || {
                provider.execute(bounded, format)
            })
            .await;

            match result {
                Ok(reply) => {
                    if !failures.is_empty() {
                        info!(provider = %provider.name(), failed = failures.len(), "fallback provider succeeded");
                    }
                    return Ok(reply);
                }
                Err(e) => {
                    warn!(provider = %provider.name(), error = %e, "provider failed, trying next");
                    failures.push(format!("{}: {e}", provider.name()));
                }
            }
        }

        Err(LlmError::AllProvidersFailed(failures))
    }
}
