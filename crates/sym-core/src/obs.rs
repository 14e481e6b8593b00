//! Structured lifecycle events for validation passes.
//!
//! Every pass gets a [`ValidationSpan`] carrying a unique `pass_id`; the
//! `emit_*` functions log one `event=...` line per lifecycle step.

use tracing::{info, warn, Span};
use uuid::Uuid;

/// Span tagging every log line of one validation pass with its `pass_id`.
///
/// ```ignore
/// let pass = ValidationSpan::new();
/// run_pass().instrument(pass.span()).await;
/// ```
#[derive(Debug, Clone)]
pub struct ValidationSpan {
    pass_id: String,
    span: Span,
}

impl ValidationSpan {
    pub fn new() -> Self {
        let pass_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("sym.validation", pass_id = %pass_id);
        Self { pass_id, span }
    }

    pub fn pass_id(&self) -> &str {
        &self.pass_id
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }
}

impl Default for ValidationSpan {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit event: a pass started.
pub fn emit_validation_started(pass_id: &str, changes: usize, units: usize, concurrency: usize) {
    info!(
        event = "validation.started",
        pass_id = %pass_id,
        changes = changes,
        units = units,
        concurrency = concurrency,
    );
}

/// Emit event: a unit completed, with the number of violations it found.
pub fn emit_unit_finished(engine: &str, files: usize, violations: usize, duration_ms: u64) {
    info!(
        event = "unit.finished",
        engine = %engine,
        files = files,
        violations = violations,
        duration_ms = duration_ms,
    );
}

/// Emit event: a unit could not complete.
pub fn emit_unit_failed(engine: &str, rule_ids: &[String], error: &dyn std::fmt::Display) {
    warn!(
        event = "unit.failed",
        engine = %engine,
        rules = %rule_ids.join(","),
        error = %error,
    );
}

/// Emit event: a pass finished.
pub fn emit_validation_finished(
    pass_id: &str,
    checked: usize,
    failed: usize,
    violations: usize,
    errors: usize,
    duration_ms: u64,
) {
    info!(
        event = "validation.finished",
        pass_id = %pass_id,
        checked = checked,
        failed = failed,
        violations = violations,
        errors = errors,
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_span_ids_are_unique() {
        let a = ValidationSpan::new();
        let b = ValidationSpan::new();
        assert_ne!(a.pass_id(), b.pass_id());
        assert!(Uuid::parse_str(a.pass_id()).is_ok());
    }
}
