//! LLM provider error types.

/// Errors from LLM provider calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM provider not configured")]
    NotConfigured,

    #[error("API key missing: set {0}")]
    ApiKeyMissing(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("provider process failed: {0}")]
    Process(String),

    #[error("all providers failed: {}", .0.join("; "))]
    AllProvidersFailed(Vec<String>),
}

impl LlmError {
    /// Whether another attempt against the same provider might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Request(_) | LlmError::Timeout { .. } | LlmError::Process(_) => true,
            LlmError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Request(err.to_string())
    }
}

/// Result type for LLM operations.
pub type LlmResult<T> = std::result::Result<T, LlmError>;
