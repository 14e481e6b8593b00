use std::fmt::Write as _;
use std::time::Instant;

use tracing::{debug, warn};

use sym_core::change::Change;
use sym_core::policy::PolicyRule;
use sym_core::violation::Violation;
use sym_llm::{truncate_chars, LlmError, ResponseFormat};

use super::{resolve_unit_file, UnitContext};
use crate::classifier::LLM_ENGINE;
use crate::error::ValidatorResult;
use crate::response::parse_findings;

/// Per-file diff budget inside a bundled prompt.
const MAX_DIFF_CHARS: usize = 3000;

const DEFAULT_SEVERITY: &str = "warning";

const FILES_TRUNCATED: &str = "\n... (remaining files truncated)\n";

const RESPONSE_INSTRUCTIONS: &str = "Respond with ONLY a JSON array, one object per violation found:\n\
     [{\"rule_id\": \"<rule id>\", \"file\": \"<file path>\", \"violates\": true, \
     \"confidence\": \"high|medium|low\", \"description\": \"...\", \"suggestion\": \"...\"}]\n\
     Use the exact rule_id and file path given above. Respond with [] when nothing is violated.";

/// Every LLM rule and change reviewed in a single agentic session.
#[derive(Debug, Clone)]
pub struct AgenticLlmUnit {
    pub rules: Vec<PolicyRule>,
    pub changes: Vec<Change>,
}

impl AgenticLlmUnit {
    pub fn files(&self) -> Vec<String> {
        self.changes
            .iter()
            .filter(|c| !c.is_deleted())
            .map(|c| c.file_path.clone())
            .collect()
    }

    pub(crate) async fn execute(&self, ctx: &UnitContext) -> ValidatorResult<Vec<Violation>> {
        let provider = ctx.provider.as_ref().ok_or(LlmError::NotConfigured)?;
        if self.rules.is_empty() || self.files().is_empty() {
            return Ok(Vec::new());
        }

        let prompt = self.prompt(provider.info().profile.max_prompt_chars);

        let start = Instant::now();
        let reply = provider.execute(&prompt, ResponseFormat::Json).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let findings = parse_findings(&reply)?;
        debug!(findings = findings.len(), latency_ms, "agentic review finished");

        let files = self.files();
        let mut violations = Vec::new();
        for finding in findings {
            if !finding.verdict.is_actionable() {
                continue;
            }
            let Some(file) = resolve_unit_file(&files, &finding.file) else {
                warn!(file = %finding.file, rule_id = %finding.rule_id, "dropping finding for unreviewed file");
                continue;
            };
            let severity = self
                .rules
                .iter()
                .find(|r| r.id == finding.rule_id)
                .map(|r| r.severity.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SEVERITY.to_string());

            violations.push(Violation {
                message: finding.verdict.message(),
                rule_id: finding.rule_id,
                severity,
                file: file.to_string(),
                raw_output: reply.clone(),
                tool_name: LLM_ENGINE.to_string(),
                execution_ms: latency_ms,
                ..Violation::default()
            });
        }
        Ok(violations)
    }

    /// Rules, then files, then response instructions. When over
    /// `max_chars` the files section is cut so the instructions survive.
    fn prompt(&self, max_chars: usize) -> String {
        let mut header = String::from(
            "You are reviewing code changes against a project's coding conventions.\n\
             Check every file below against every rule. Report only violations you are certain of.\n\n\
             === RULES TO CHECK ===\n",
        );
        for rule in &self.rules {
            let _ = writeln!(header, "- id: {}", rule.id);
            let _ = writeln!(header, "  description: {}", rule.description);
            let _ = writeln!(header, "  severity: {}", rule.severity);
            if !rule.category.is_empty() {
                let _ = writeln!(header, "  category: {}", rule.category);
            }
            if let Some(languages) = rule.when.as_ref().map(|w| &w.languages).filter(|l| !l.is_empty()) {
                let _ = writeln!(header, "  languages: {}", languages.join(", "));
            }
        }
        header.push_str("\n=== FILES AND CHANGES TO REVIEW ===\n");

        let mut files = String::new();
        for change in self.changes.iter().filter(|c| !c.is_deleted()) {
            let code = change.code_lines().join("\n");
            let _ = writeln!(files, "\n--- {} ({}) ---", change.file_path, change.status.as_letter());
            files.push_str(truncate_chars(&code, MAX_DIFF_CHARS));
            if code.len() > MAX_DIFF_CHARS {
                files.push_str("\n... (truncated)");
            }
            files.push('\n');
        }

        let footer = format!("\n=== END OF FILES ===\n\n{RESPONSE_INSTRUCTIONS}");

        let budget = max_chars.saturating_sub(header.len() + footer.len());
        if files.len() > budget {
            debug!(files_chars = files.len(), budget, "cutting files section to fit prompt budget");
            let kept = truncate_chars(&files, budget.saturating_sub(FILES_TRUNCATED.len())).len();
            files.truncate(kept);
            files.push_str(FILES_TRUNCATED);
        }

        let prompt = format!("{header}{files}{footer}");
        // rules alone can exceed a tiny budget
        truncate_chars(&prompt, max_chars).to_string()
    }
}
