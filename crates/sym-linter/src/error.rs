//! Linter error types.

/// Errors from locating, installing or running an external linter.
#[derive(Debug, thiserror::Error)]
pub enum LinterError {
    #[error("linter not found: {0}")]
    NotFound(String),

    #[error("{tool} is not available: {reason}")]
    Unavailable { tool: String, reason: String },

    #[error("failed to install {tool}: {reason}")]
    InstallFailed { tool: String, reason: String },

    #[error("failed to execute {tool}: {reason}")]
    ExecutionFailed { tool: String, reason: String },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("failed to parse {tool} output: {reason}")]
    ParseFailed { tool: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for linter operations.
pub type LinterResult<T> = std::result::Result<T, LinterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linter_error_display() {
        let err = LinterError::Timeout {
            tool: "eslint".to_string(),
            secs: 120,
        };
        assert_eq!(err.to_string(), "eslint timed out after 120s");

        let err = LinterError::NotFound("pmd".to_string());
        assert!(err.to_string().contains("pmd"));
    }
}
