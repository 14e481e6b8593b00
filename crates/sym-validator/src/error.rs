//! Validator error types.

use sym_linter::LinterError;
use sym_llm::LlmError;

/// Errors from a validation pass or one of its execution units.
///
/// Only [`ValidatorError::PolicyNotLoaded`] escapes `validate_changes`;
/// every other variant is recorded against the unit that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    #[error("policy is not loaded")]
    PolicyNotLoaded,

    #[error("linter error: {0}")]
    Linter(#[from] LinterError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("no config available for {0}")]
    MissingConfig(String),

    #[error("unparseable LLM response: {0}")]
    UnparseableResponse(String),

    #[error("deadline exceeded after {0}ms")]
    DeadlineExceeded(u64),

    #[error("unit task failed: {0}")]
    TaskFailed(String),
}

/// Result type for validator operations.
pub type ValidatorResult<T> = std::result::Result<T, ValidatorError>;
