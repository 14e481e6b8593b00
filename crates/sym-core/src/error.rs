//! Core error taxonomy for Symphony.

/// Errors produced by policy loading, configuration and git plumbing.
#[derive(Debug, thiserror::Error)]
pub enum SymError {
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("git error: {0}")]
    GitError(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, SymError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sym_error_display() {
        let err = SymError::InvalidPolicy("rules must be an array".to_string());
        assert!(err.to_string().contains("invalid policy"));

        let err = SymError::GitError("not a repository".to_string());
        assert!(err.to_string().contains("git error"));
        assert!(err.to_string().contains("not a repository"));
    }

    #[test]
    fn test_serde_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: SymError = parse.unwrap_err().into();
        assert!(err.to_string().contains("serialization error"));
    }
}
