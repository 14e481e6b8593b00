//! Execution controls for provider calls: per-attempt timeout and bounded
//! retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::provider::ProviderProfile;

/// Timeout and retry budget for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionControls {
    /// Wall-clock limit for a single attempt.
    pub timeout: Duration,
    /// Retries after the first attempt (0 = run once).
    pub max_retries: u32,
    /// Base delay, doubled after each failed attempt.
    pub backoff_base: Duration,
}

impl ExecutionControls {
    pub fn from_profile(profile: &ProviderProfile) -> Self {
        Self {
            timeout: profile.timeout(),
            max_retries: profile.max_retries,
            backoff_base: Duration::from_millis(500),
        }
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }
}

/// Run `call` under `controls`.
///
/// Timeouts and retryable errors are retried until the budget runs out;
/// non-retryable errors return immediately. The last error is returned.
pub async fn execute_with_controls<T, F, Fut>(
    provider: &str,
    controls: &ExecutionControls,
    call: F,
) -> LlmResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    let max_attempts = controls.max_retries + 1;
    let mut attempt = 1;

    loop {
        let err = match tokio::time::timeout(controls.timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => err,
            Err(_elapsed) => LlmError::Timeout {
                provider: provider.to_string(),
                timeout_ms: controls.timeout.as_millis() as u64,
            },
        };

        if attempt >= max_attempts || !err.is_retryable() {
            return Err(err);
        }

        let delay = controls.backoff_base * 2u32.saturating_pow(attempt - 1);
        debug!(provider = %provider, attempt = attempt, error = %err, "retrying provider call");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
