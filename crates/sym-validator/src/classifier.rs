//! Rule classification by enforcement engine.

use sym_core::policy::{PolicyRule, ENGINE_KEY};

/// Engine name reserved for LLM semantic validation.
pub const LLM_ENGINE: &str = "llm-validator";

/// How a rule is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineClass {
    /// A deterministic external linter.
    Linter,
    /// LLM semantic validation.
    Llm,
}

/// The engine named in `rule.check["engine"]`, if it is a non-empty string.
pub fn engine_of(rule: &PolicyRule) -> Option<&str> {
    rule.check
        .get(ENGINE_KEY)
        .and_then(|v| v.as_str())
        .filter(|e| !e.is_empty())
}

pub fn classify(engine: &str) -> EngineClass {
    if engine == LLM_ENGINE {
        EngineClass::Llm
    } else {
        EngineClass::Linter
    }
}
