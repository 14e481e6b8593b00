use std::path::Path;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use sym_core::policy::{PolicyRule, ENGINE_KEY};
use sym_core::violation::Violation;
use sym_linter::subprocess::truncate_for_log;
use sym_linter::{InstallConfig, LinterError, LinterViolation, ToolOutput};

use super::{resolve_unit_file, UnitContext};
use crate::error::{ValidatorError, ValidatorResult};

/// Key in a rule's check map naming the linter's own rule identifier.
const TOOL_RULE_KEY: &str = "ruleId";

/// One linter invocation over every rule and file of an engine group.
#[derive(Debug, Clone)]
pub struct LinterUnit {
    pub engine: String,
    pub rules: Vec<PolicyRule>,
    pub files: Vec<String>,
}

impl LinterUnit {
    pub(crate) async fn execute(&self, ctx: &UnitContext) -> ValidatorResult<Vec<Violation>> {
        if self.files.is_empty() {
            return Ok(Vec::new());
        }

        let linter = ctx.linters.get(&self.engine)?;

        if let Err(reason) = linter.check_availability().await {
            info!(engine = %self.engine, %reason, "linter unavailable, installing");
            linter
                .install(&InstallConfig {
                    tools_dir: ctx.tools_dir.clone(),
                    version: String::new(),
                    force: false,
                })
                .await?;
        }

        let config = self.resolve_config(linter.config_file(), &ctx.work_dir).await?;

        let start = Instant::now();
        let output = linter.execute(&config, &self.files).await?;
        let execution_ms = start.elapsed().as_millis() as u64;
        debug!(
            engine = %self.engine,
            exit_code = output.exit_code,
            stdout = %truncate_for_log(&output.stdout),
            "linter finished"
        );

        let findings = linter.parse_output(&output)?;
        Ok(self.map_findings(findings, &output, execution_ms))
    }

    /// `<work_dir>/.sym/<config_file>` if present, else a config generated
    /// from the first rule's check map.
    async fn resolve_config(&self, config_file: &str, work_dir: &Path) -> ValidatorResult<Vec<u8>> {
        let path = work_dir.join(".sym").join(config_file);
        if !config_file.is_empty() && tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
            debug!(engine = %self.engine, path = %path.display(), "using linter config from repository");
            return tokio::fs::read(&path)
                .await
                .map_err(|e| ValidatorError::Linter(LinterError::Io(e)));
        }

        let rule = self
            .rules
            .first()
            .ok_or_else(|| ValidatorError::MissingConfig(self.engine.clone()))?;
        let mut config = rule.check.clone();
        config.remove(ENGINE_KEY);
        config.remove("desc");
        if !rule.description.is_empty() {
            config.insert("description".to_string(), Value::String(rule.description.clone()));
        }
        serde_json::to_vec(&Value::Object(config))
            .map_err(|e| ValidatorError::MissingConfig(format!("{}: {e}", self.engine)))
    }

    fn map_findings(
        &self,
        findings: Vec<LinterViolation>,
        output: &ToolOutput,
        execution_ms: u64,
    ) -> Vec<Violation> {
        let mut violations = Vec::with_capacity(findings.len());
        for finding in findings {
            let Some(file) = resolve_unit_file(&self.files, &finding.file) else {
                warn!(engine = %self.engine, file = %finding.file, "dropping finding outside checked files");
                continue;
            };

            let (rule_id, severity) = match self.policy_rule(&finding.rule_id) {
                Some(rule) => (rule.id.clone(), rule.severity.clone()),
                None => (
                    format!("{}-{}", self.engine, finding.rule_id),
                    finding.severity.clone(),
                ),
            };

            violations.push(Violation {
                rule_id,
                severity: if severity.is_empty() { "error".to_string() } else { severity },
                message: finding.message,
                file: file.to_string(),
                line: finding.line,
                column: finding.column,
                raw_output: output.stdout.clone(),
                raw_error: output.stderr.clone(),
                tool_name: self.engine.clone(),
                execution_ms,
            });
        }
        violations
    }

    /// Match a tool rule id to a policy rule: declared `ruleId` first, then
    /// substring of the policy rule id, then the first rule.
    ///
    /// The last step can misattribute findings in groups with several
    /// unrelated rules.
    fn policy_rule(&self, tool_rule_id: &str) -> Option<&PolicyRule> {
        self.rules
            .iter()
            .find(|r| r.check.get(TOOL_RULE_KEY).and_then(Value::as_str) == Some(tool_rule_id))
            .or_else(|| {
                self.rules
                    .iter()
                    .find(|r| !tool_rule_id.is_empty() && r.id.contains(tool_rule_id))
            })
            .or_else(|| self.rules.first())
    }

}
