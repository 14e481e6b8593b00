//! Validation outcomes: violations, unit errors and the aggregate result.

use serde::{Deserialize, Serialize};

/// Synthetic rule ID for files the acting role may not write.
pub const RBAC_RULE_ID: &str = "rbac-permission-denied";

/// A detected breach of a policy rule in a specific file/location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub rule_id: String,
    pub severity: String,
    pub message: String,
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,

    /// Raw tool/provider output that produced the finding.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_output: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_error: String,

    /// Which tool detected this (`eslint`, `llm-validator`, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tool_name: String,

    #[serde(default)]
    pub execution_ms: u64,
}

impl Violation {
    /// The violation recorded for a file the current role may not modify.
    pub fn rbac_denied(role: &str, file: impl Into<String>) -> Self {
        Self {
            rule_id: RBAC_RULE_ID.to_string(),
            severity: "error".to_string(),
            message: format!("Role '{role}' does not have permission to modify this file"),
            file: file.into(),
            ..Self::default()
        }
    }
}

/// A failure to complete a check (tool crashed, LLM call failed).
///
/// Distinct from a [`Violation`]: it means "could not check", never
/// "checked and found nothing wrong".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub rule_ids: Vec<String>,
    pub engine: String,
    pub message: String,
}

/// Terminal aggregate of one validation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub violations: Vec<Violation>,
    pub errors: Vec<ValidationError>,
    /// Distinct files touched by any execution unit.
    pub checked: usize,
    pub passed: usize,
    /// Distinct files appearing in any violation.
    pub failed: usize,
}

impl ValidationResult {
    /// No violations and no unit errors.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.errors.is_empty()
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
