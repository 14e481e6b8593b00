//! Interpreting LLM verdicts.

use serde::Deserialize;

use sym_llm::{extract_json, truncate_chars};

use crate::error::{ValidatorError, ValidatorResult};

const DEFAULT_CONFIDENCE: &str = "medium";
const DEFAULT_DESCRIPTION: &str = "Rule violation detected";

/// One rule-against-code judgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub violates: bool,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggestion: String,
}

impl Verdict {
    fn normalized(mut self) -> Self {
        if self.confidence.trim().is_empty() {
            self.confidence = DEFAULT_CONFIDENCE.to_string();
        }
        if self.violates && self.description.trim().is_empty() {
            self.description = DEFAULT_DESCRIPTION.to_string();
        }
        self
    }

    /// Violating with anything but low confidence.
    pub fn is_actionable(&self) -> bool {
        self.violates && !self.confidence.eq_ignore_ascii_case("low")
    }

    pub fn message(&self) -> String {
        if self.suggestion.is_empty() {
            self.description.clone()
        } else {
            format!("{} | Suggestion: {}", self.description, self.suggestion)
        }
    }
}

/// A verdict from a batched review, tagged with its rule and file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Finding {
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub file: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

/// Parse a single-verdict reply.
///
/// Strict JSON is tried first; almost-JSON falls back to a lexical scan for
/// the `violates` flag.
pub fn parse_verdict(reply: &str) -> ValidatorResult<Verdict> {
    if let Some(json) = extract_json(reply) {
        if let Ok(verdict) = serde_json::from_str::<Verdict>(&json) {
            return Ok(verdict.normalized());
        }
    }
    lexical_verdict(reply).ok_or_else(|| unparseable(reply))
}

/// Parse a batched reply: a JSON array of findings.
pub fn parse_findings(reply: &str) -> ValidatorResult<Vec<Finding>> {
    let json = extract_json(reply).ok_or_else(|| unparseable(reply))?;
    let findings: Vec<Finding> = serde_json::from_str(&json).map_err(|_| unparseable(reply))?;
    Ok(findings
        .into_iter()
        .map(|f| Finding {
            verdict: f.verdict.normalized(),
            ..f
        })
        .collect())
}

fn unparseable(reply: &str) -> ValidatorError {
    ValidatorError::UnparseableResponse(truncate_chars(reply, 200).to_string())
}

fn lexical_verdict(reply: &str) -> Option<Verdict> {
    let lower = reply.to_lowercase();
    if lower.contains("\"violates\": false")
        || lower.contains("\"violates\":false")
        || lower.contains("does not violate")
    {
        return Some(Verdict::default().normalized());
    }
    if lower.contains("\"violates\": true") || lower.contains("\"violates\":true") {
        let verdict = Verdict {
            violates: true,
            confidence: DEFAULT_CONFIDENCE.to_string(),
            description: string_field(reply, "description").unwrap_or_default(),
            suggestion: string_field(reply, "suggestion").unwrap_or_default(),
        };
        return Some(verdict.normalized());
    }
    None
}

/// The value of `"key": "..."` anywhere in `text`, unescaped naively.
fn string_field(text: &str, key: &str) -> Option<String> {
    let needle = format!("\"{key}\"");
    let after_key = &text[text.find(&needle)? + needle.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?.trim_start();
    let body = after_colon.strip_prefix('"')?;

    let mut value = String::new();
    let mut escaped = false;
    for c in body.chars() {
        match (escaped, c) {
            (true, 'n') => {
                value.push('\n');
                escaped = false;
            }
            (true, other) => {
                value.push(other);
                escaped = false;
            }
            (false, '\\') => escaped = true,
            (false, '"') => return Some(value),
            (false, other) => value.push(other),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_verdict_with_prose() {
        let reply = "Here is my review:\n```json\n{\"violates\": true, \"confidence\": \"high\", \"description\": \"Hardcoded key\", \"suggestion\": \"Use env\"}\n```";
        let verdict = parse_verdict(reply).unwrap();
        assert!(verdict.is_actionable());
        assert_eq!(verdict.message(), "Hardcoded key | Suggestion: Use env");
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let verdict = parse_verdict(r#"{"violates": true}"#).unwrap();
        assert_eq!(verdict.confidence, "medium");
        assert_eq!(verdict.message(), "Rule violation detected");
        assert!(verdict.is_actionable());
    }

    #[test]
    fn test_low_confidence_not_actionable() {
        let verdict =
            parse_verdict(r#"{"violates": true, "confidence": "LOW", "description": "maybe"}"#)
                .unwrap();
        assert!(!verdict.is_actionable());
    }

    #[test]
    fn test_lexical_fallback() {
        let clean = parse_verdict("The code does not violate the rule.").unwrap();
        assert!(!clean.violates);

        let broken = r#"{"violates": true, "description": "Uses \"eval\"", "suggestion": "Remove it", }"#;
        let verdict = parse_verdict(broken).unwrap();
        assert!(verdict.violates);
        assert_eq!(verdict.confidence, "medium");
        assert_eq!(verdict.description, "Uses \"eval\"");
        assert_eq!(verdict.suggestion, "Remove it");
    }

    #[test]
    fn test_unrecognisable_reply_is_error() {
        let err = parse_verdict("I am not sure what you mean.").unwrap_err();
        assert!(matches!(err, ValidatorError::UnparseableResponse(_)));
    }

    #[test]
    fn test_parse_findings_array() {
        let reply = r#"Findings:
[
  {"rule_id": "r1", "file": "a.go", "violates": true, "confidence": "high", "description": "bad"},
  {"rule_id": "r2", "file": "b.go", "violates": false}
]"#;
        let findings = parse_findings(reply).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].rule_id, "r1");
        assert!(findings[0].verdict.is_actionable());
        assert_eq!(findings[1].verdict.confidence, "medium");
        assert!(!findings[1].verdict.is_actionable());
    }

    #[test]
    fn test_findings_must_be_an_array() {
        assert!(parse_findings(r#"{"violates": true}"#).is_err());
        assert!(parse_findings("no json here").is_err());
    }
}
