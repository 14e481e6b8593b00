//! The validation pass entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{instrument, Instrument};

use sym_core::change::Change;
use sym_core::config::{default_concurrency, SymConfig, DEFAULT_DEADLINE_SECS};
use sym_core::obs::{emit_validation_finished, emit_validation_started, ValidationSpan};
use sym_core::policy::CodePolicy;
use sym_core::rbac::{PolicyRoleStore, RoleStore};
use sym_core::violation::ValidationResult;
use sym_linter::{default_tools_dir, LinterRegistry};
use sym_llm::Provider;

use crate::aggregator::{aggregate, checked_files};
use crate::error::{ValidatorError, ValidatorResult};
use crate::grouper::group_rules;
use crate::rbac_gate::check_permissions;
use crate::scheduler::Scheduler;
use crate::unit::{build_units, UnitContext};

/// Validates change sets against a code policy.
///
/// Collaborators are injected: linters through a [`LinterRegistry`], the
/// LLM through one effective [`Provider`] (usually a fallback chain), and
/// the acting role through a [`RoleStore`].
pub struct Validator {
    policy: Option<Arc<CodePolicy>>,
    linters: Arc<LinterRegistry>,
    provider: Option<Arc<dyn Provider>>,
    roles: Arc<dyn RoleStore>,
    work_dir: PathBuf,
    tools_dir: PathBuf,
    concurrency: usize,
    deadline: Duration,
}

impl Validator {
    /// A validator with no linters, no LLM provider and no acting role.
    pub fn new(policy: Option<Arc<CodePolicy>>) -> Self {
        Self {
            policy,
            linters: Arc::new(LinterRegistry::new()),
            provider: None,
            roles: Arc::new(PolicyRoleStore::default()),
            work_dir: PathBuf::from("."),
            tools_dir: default_tools_dir(),
            concurrency: default_concurrency(),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
        }
    }

    pub fn with_linters(mut self, linters: LinterRegistry) -> Self {
        self.linters = Arc::new(linters);
        self
    }

    pub fn with_provider(mut self, provider: Option<Arc<dyn Provider>>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_role_store(mut self, roles: Arc<dyn RoleStore>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_tools_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tools_dir = dir.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Apply deadline, concurrency and tools dir from configuration.
    pub fn with_config(self, config: &SymConfig) -> Self {
        self.with_deadline(config.deadline())
            .with_concurrency(config.concurrency())
            .with_tools_dir(config.tools_dir())
    }

    pub fn policy(&self) -> Option<&CodePolicy> {
        self.policy.as_deref()
    }

    /// Run one validation pass over `changes`.
    ///
    /// Only a missing policy fails the call. Unit failures are reported in
    /// [`ValidationResult::errors`] next to the violations.
    #[instrument(skip_all, fields(changes = changes.len()))]
    pub async fn validate_changes(&self, changes: &[Change]) -> ValidatorResult<ValidationResult> {
        let policy = self.policy.as_deref().ok_or(ValidatorError::PolicyNotLoaded)?;
        let pass = ValidationSpan::new();
        let pass_id = pass.pass_id().to_string();
        Ok(self.run_pass(policy, changes, &pass_id).instrument(pass.span()).await)
    }

    async fn run_pass(&self, policy: &CodePolicy, changes: &[Change], pass_id: &str) -> ValidationResult {
        let started = Instant::now();

        let rbac_violations = check_permissions(policy, self.roles.as_ref(), changes);

        let ctx = Arc::new(UnitContext {
            linters: Arc::clone(&self.linters),
            provider: self.provider.clone(),
            work_dir: self.work_dir.clone(),
            tools_dir: self.tools_dir.clone(),
        });
        let units = build_units(group_rules(policy, changes), &ctx);
        let checked = checked_files(&units);

        let scheduler = Scheduler::new(self.concurrency, self.deadline);
        emit_validation_started(pass_id, changes.len(), units.len(), scheduler.concurrency());

        let outcome = scheduler.run(units, ctx).await;
        let result = aggregate(checked, rbac_violations, outcome.violations, outcome.errors);

        emit_validation_finished(
            pass_id,
            result.checked,
            result.failed,
            result.violations.len(),
            result.errors.len(),
            started.elapsed().as_millis() as u64,
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_policy_is_fatal() {
        let err = Validator::new(None)
            .validate_changes(&[Change::modified("a.js", "+x")])
            .await
            .unwrap_err();
        assert!(matches!(err, ValidatorError::PolicyNotLoaded));
    }

    #[tokio::test]
    async fn test_empty_policy_is_clean() {
        let result = Validator::new(Some(Arc::new(CodePolicy::default())))
            .validate_changes(&[Change::modified("a.js", "+x")])
            .await
            .unwrap();
        assert!(result.is_clean());
        assert_eq!(result.checked, 0);
    }

    #[test]
    fn test_config_applied() {
        let mut config = SymConfig::default();
        config.validation.deadline_secs = 30;
        config.validation.max_concurrency = Some(3);
        config.validation.tools_dir = Some(PathBuf::from("/opt/sym"));

        let validator = Validator::new(None).with_config(&config);
        assert_eq!(validator.deadline, Duration::from_secs(30));
        assert_eq!(validator.concurrency, 3);
        assert_eq!(validator.tools_dir, PathBuf::from("/opt/sym"));
    }
}
