//! The [`Linter`] trait and the values it exchanges.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LinterResult;

pub use sym_core::default_tools_dir;

/// What a linter can check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    pub name: String,
    pub supported_languages: Vec<String>,
    pub supported_categories: Vec<String>,
    pub version: String,
}

/// Tool installation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallConfig {
    /// Installation root, normally `~/.sym/tools`.
    pub tools_dir: PathBuf,
    /// Version to install; empty means the linter's default.
    pub version: String,
    /// Reinstall even when already present.
    pub force: bool,
}

/// Raw result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ToolOutput {
    /// Output of a run that had nothing to check.
    pub fn empty(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }
}

/// One finding as reported by the tool, before mapping to policy rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinterViolation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    /// `error`, `warning` or `info`; may be empty.
    pub severity: String,
    /// The tool's own rule identifier (`no-console`, ...).
    pub rule_id: String,
}

/// An external deterministic checker.
#[async_trait]
pub trait Linter: Send + Sync {
    /// Engine name this linter serves (`eslint`, `pylint`, ...).
    fn name(&self) -> &str;

    /// Config file name looked up under `.sym/` (`.eslintrc.json`).
    fn config_file(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// `Ok(())` when the tool is installed and usable.
    async fn check_availability(&self) -> LinterResult<()>;

    async fn install(&self, config: &InstallConfig) -> LinterResult<()>;

    /// Run the tool once over `files` with the given config bytes.
    ///
    /// A non-zero exit code is not an error: linters exit non-zero when
    /// they find problems.
    async fn execute(&self, config: &[u8], files: &[String]) -> LinterResult<ToolOutput>;

    fn parse_output(&self, output: &ToolOutput) -> LinterResult<Vec<LinterViolation>>;
}

/// Normalise tool severity names to `error`, `warning` or `info`.
pub fn map_severity(raw: &str) -> &'static str {
    match raw.to_ascii_lowercase().as_str() {
        "error" | "err" | "fatal" | "critical" => "error",
        "warning" | "warn" => "warning",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_severity() {
        assert_eq!(map_severity("FATAL"), "error");
        assert_eq!(map_severity("warn"), "warning");
        assert_eq!(map_severity("convention"), "info");
    }

    #[test]
    fn test_default_tools_dir() {
        assert!(default_tools_dir().ends_with(".sym/tools"));
    }
}
