use std::time::Instant;

use tracing::debug;

use sym_core::change::Change;
use sym_core::policy::PolicyRule;
use sym_core::violation::Violation;
use sym_llm::{truncate_chars, LlmError, ResponseFormat};

use super::UnitContext;
use crate::classifier::LLM_ENGINE;
use crate::error::ValidatorResult;
use crate::response::parse_verdict;

/// Added-code budget for one parallel-API prompt.
pub(crate) const MAX_CODE_CHARS: usize = 3000;

const SYSTEM_PROMPT: &str = r#"You are a strict code reviewer. Decide whether a code change violates ONE specific coding convention.

Rules for your answer:
1. Only report a violation when you are certain the code breaks the convention.
2. When unsure, answer that the code does not violate it.
3. Judge only the convention given, not any other style concern.

Respond with ONLY a JSON object, no markdown and no prose:
{"violates": false, "confidence": "high", "description": "", "suggestion": ""}

Fields:
- violates: true only when the code certainly violates the convention
- confidence: "high" | "medium" | "low"
- description: short explanation of the violation (empty when not violated)
- suggestion: how to fix it (empty when not violated)

Example:
Convention: "No console.log in production code"
Code: "console.log('debug');"
{"violates": true, "confidence": "high", "description": "console.log statement found", "suggestion": "Use the project logger instead"}"#;

/// One LLM call checking one rule against one change.
#[derive(Debug, Clone)]
pub struct ParallelLlmUnit {
    pub rule: PolicyRule,
    pub change: Change,
}

impl ParallelLlmUnit {
    pub(crate) async fn execute(&self, ctx: &UnitContext) -> ValidatorResult<Vec<Violation>> {
        let provider = ctx.provider.as_ref().ok_or(LlmError::NotConfigured)?;

        if self.change.is_deleted() {
            return Ok(Vec::new());
        }
        let lines = self.change.code_lines();
        if lines.is_empty() {
            debug!(file = %self.change.file_path, rule_id = %self.rule.id, "no added code, skipping");
            return Ok(Vec::new());
        }

        let prompt = self.prompt(&lines.join("\n"));
        let start = Instant::now();
        let reply = provider.execute(&prompt, ResponseFormat::Json).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let verdict = parse_verdict(&reply)?;
        debug!(
            file = %self.change.file_path,
            rule_id = %self.rule.id,
            violates = verdict.violates,
            confidence = %verdict.confidence,
            latency_ms,
            "llm verdict"
        );
        if !verdict.is_actionable() {
            return Ok(Vec::new());
        }

        Ok(vec![Violation {
            rule_id: self.rule.id.clone(),
            severity: self.rule.severity.clone(),
            message: verdict.message(),
            file: self.change.file_path.clone(),
            raw_output: reply,
            tool_name: LLM_ENGINE.to_string(),
            execution_ms: latency_ms,
            ..Violation::default()
        }])
    }

    fn prompt(&self, code: &str) -> String {
        let snippet = if code.len() > MAX_CODE_CHARS {
            format!("{}\n... (truncated)", truncate_chars(code, MAX_CODE_CHARS))
        } else {
            code.to_string()
        };

        format!(
            "{SYSTEM_PROMPT}\n\nFile: {}\n\n=== RULE TO CHECK ===\n{}\n\n=== CODE TO REVIEW ===\n{}\n\n\
             Analyze the code and determine if it violates the rule. Respond with JSON only.",
            self.change.file_path, self.rule.description, snippet
        )
    }
}
