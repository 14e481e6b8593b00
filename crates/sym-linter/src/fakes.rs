//! In-memory linter fake (testing only).
//!
//! [`StaticLinter`] returns scripted findings without spawning anything and
//! records the config and file batches it was invoked with.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{LinterError, LinterResult};
use crate::types::{Capabilities, InstallConfig, Linter, LinterViolation, ToolOutput};

/// One recorded `execute` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteCall {
    pub config: Vec<u8>,
    pub files: Vec<String>,
}

/// Scripted linter.
#[derive(Debug, Default)]
pub struct StaticLinter {
    name: String,
    config_file: String,
    findings: Vec<LinterViolation>,
    available: bool,
    fail_install: bool,
    fail_execute: bool,
    crash: bool,
    delay: Option<Duration>,
    installs: AtomicUsize,
    calls: Mutex<Vec<ExecuteCall>>,
}

impl StaticLinter {
    /// An installed linter that finds nothing.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            config_file: format!(".{name}rc.json"),
            name,
            available: true,
            ..Self::default()
        }
    }

    pub fn with_config_file(mut self, file: impl Into<String>) -> Self {
        self.config_file = file.into();
        self
    }

    /// Report a finding on every run (only for files in the batch).
    pub fn with_finding(
        mut self,
        file: impl Into<String>,
        line: u32,
        rule_id: impl Into<String>,
        severity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.findings.push(LinterViolation {
            file: file.into(),
            line,
            column: 1,
            message: message.into(),
            severity: severity.into(),
            rule_id: rule_id.into(),
        });
        self
    }

    /// Start uninstalled; the first `install` makes it available.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    /// Exit with code 2, empty stdout and a message on stderr, the way a
    /// linter reports a fatal config or runtime error.
    pub fn crashing(mut self) -> Self {
        self.crash = true;
        self
    }

    /// Sleep this long inside `execute`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ExecuteCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn install_count(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Linter for StaticLinter {
    fn name(&self) -> &str {
        &self.name
    }

    fn config_file(&self) -> &str {
        &self.config_file
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            name: self.name.clone(),
            ..Capabilities::default()
        }
    }

    async fn check_availability(&self) -> LinterResult<()> {
        if self.available || self.install_count() > 0 {
            Ok(())
        } else {
            Err(LinterError::Unavailable {
                tool: self.name.clone(),
                reason: "not installed".to_string(),
            })
        }
    }

    async fn install(&self, _config: &InstallConfig) -> LinterResult<()> {
        if self.fail_install {
            return Err(LinterError::InstallFailed {
                tool: self.name.clone(),
                reason: "scripted install failure".to_string(),
            });
        }
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, config: &[u8], files: &[String]) -> LinterResult<ToolOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ExecuteCall {
                config: config.to_vec(),
                files: files.to_vec(),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_execute {
            return Err(LinterError::ExecutionFailed {
                tool: self.name.clone(),
                reason: "scripted failure".to_string(),
            });
        }

        if self.crash {
            return Ok(ToolOutput {
                stderr: format!("{}: fatal error, cannot load config", self.name),
                exit_code: 2,
                ..ToolOutput::default()
            });
        }

        let hits: Vec<&LinterViolation> = self
            .findings
            .iter()
            .filter(|f| files.contains(&f.file))
            .collect();
        let stdout = serde_json::to_string(&hits).map_err(|e| LinterError::ParseFailed {
            tool: self.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(ToolOutput {
            exit_code: if hits.is_empty() { 0 } else { 1 },
            stdout,
            ..ToolOutput::default()
        })
    }

    fn parse_output(&self, output: &ToolOutput) -> LinterResult<Vec<LinterViolation>> {
        if output.exit_code >= 2 {
            return Err(LinterError::ExecutionFailed {
                tool: self.name.clone(),
                reason: output.stderr.clone(),
            });
        }
        serde_json::from_str(&output.stdout).map_err(|e| LinterError::ParseFailed {
            tool: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_linter_reports_findings_for_batch_files() {
        let linter = StaticLinter::new("eslint")
            .with_finding("a.js", 3, "no-console", "error", "console")
            .with_finding("other.js", 1, "no-console", "error", "console");

        let files = vec!["a.js".to_string()];
        let out = linter.execute(b"{}", &files).await.unwrap();
        let found = linter.parse_output(&out).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file, "a.js");
        assert_eq!(linter.calls()[0].files, files);
    }

    #[tokio::test]
    async fn test_crashing_run_fails_to_parse() {
        let linter = StaticLinter::new("eslint").crashing();
        let out = linter.execute(b"{}", &["a.js".to_string()]).await.unwrap();
        assert_eq!(out.exit_code, 2);
        assert!(out.stdout.is_empty());
        let err = linter.parse_output(&out).unwrap_err();
        assert!(matches!(err, LinterError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_unavailable_until_installed() {
        let linter = StaticLinter::new("eslint").unavailable();
        assert!(linter.check_availability().await.is_err());
        linter.install(&InstallConfig::default()).await.unwrap();
        assert!(linter.check_availability().await.is_ok());
        assert_eq!(linter.install_count(), 1);
    }
}
