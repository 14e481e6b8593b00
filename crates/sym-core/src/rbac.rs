//! Role-based write permissions.
//!
//! A [`RoleStore`] answers two questions for the validator: who is acting,
//! and which of a set of files that role may not modify. [`PolicyRoleStore`]
//! evaluates the `rbac.roles` block of the user policy; [`StaticRoleStore`]
//! is an in-memory stand-in for tests.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::policy::{RolePermissions, UserPolicy, UserRbac};

/// Role name meaning "no role selected".
pub const NO_ROLE: &str = "none";

/// Errors from role resolution or permission evaluation.
#[derive(Debug, thiserror::Error)]
pub enum RbacError {
    #[error("role unavailable: {0}")]
    RoleUnavailable(String),

    #[error("user policy unavailable: {0}")]
    PolicyUnavailable(String),
}

/// Outcome of a permission check over a set of files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionCheck {
    pub allowed: bool,
    /// Files the role may not modify, in input order.
    pub denied_files: Vec<String>,
}

impl PermissionCheck {
    pub fn allow_all() -> Self {
        Self {
            allowed: true,
            denied_files: Vec::new(),
        }
    }

    pub fn deny(files: Vec<String>) -> Self {
        Self {
            allowed: files.is_empty(),
            denied_files: files,
        }
    }
}

/// Source of the acting role and its write permissions.
pub trait RoleStore: Send + Sync {
    /// The role of the user running validation.
    fn current_role(&self) -> Result<String, RbacError>;

    /// Check which of `files` `role` is not permitted to modify.
    fn validate_file_permissions(
        &self,
        role: &str,
        files: &[String],
    ) -> Result<PermissionCheck, RbacError>;
}

/// Mapping of role name to member usernames (`.sym/roles.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RoleAssignments(pub BTreeMap<String, Vec<String>>);

impl RoleAssignments {
    pub fn load(path: &Path) -> Result<Self, RbacError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RbacError::RoleUnavailable(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| RbacError::RoleUnavailable(format!("invalid roles.json: {e}")))
    }

    /// Role containing `username`, or [`NO_ROLE`] when unassigned.
    pub fn role_of(&self, username: &str) -> String {
        self.0
            .iter()
            .find(|(_, users)| users.iter().any(|u| u == username))
            .map(|(role, _)| role.clone())
            .unwrap_or_else(|| NO_ROLE.to_string())
    }
}

/// Role store backed by the user policy's role definitions.
#[derive(Debug, Clone, Default)]
pub struct PolicyRoleStore {
    role: Option<String>,
    rbac: Option<UserRbac>,
}

impl PolicyRoleStore {
    pub fn new(role: Option<String>, rbac: Option<UserRbac>) -> Self {
        Self { role, rbac }
    }

    /// Load role definitions from `<repo>/.sym/user-policy.json` and resolve
    /// the acting role.
    ///
    /// An explicit `role_override` wins; otherwise `username` is looked up
    /// in `<repo>/.sym/roles.json`. A missing user policy leaves permissions
    /// undefined, so every check reports an error and RBAC is skipped.
    pub fn from_repo(repo_root: &Path, role_override: Option<String>, username: Option<&str>) -> Self {
        let sym_dir = repo_root.join(".sym");
        let rbac = match UserPolicy::load(&sym_dir.join("user-policy.json")) {
            Ok(policy) => Some(policy.rbac.unwrap_or_default()),
            Err(e) => {
                debug!(error = %e, "user policy not loaded");
                None
            }
        };

        let role = role_override.or_else(|| {
            let user = username?;
            match RoleAssignments::load(&sym_dir.join("roles.json")) {
                Ok(assignments) => Some(assignments.role_of(user)),
                Err(e) => {
                    debug!(error = %e, "role assignments not loaded");
                    None
                }
            }
        });

        Self { role, rbac }
    }
}

impl RoleStore for PolicyRoleStore {
    fn current_role(&self) -> Result<String, RbacError> {
        self.role
            .clone()
            .ok_or_else(|| RbacError::RoleUnavailable("no role configured".to_string()))
    }

    fn validate_file_permissions(
        &self,
        role: &str,
        files: &[String],
    ) -> Result<PermissionCheck, RbacError> {
        if role.is_empty() || role == NO_ROLE {
            return Ok(PermissionCheck::deny(files.to_vec()));
        }

        let rbac = self
            .rbac
            .as_ref()
            .ok_or_else(|| RbacError::PolicyUnavailable("no user policy loaded".to_string()))?;

        if rbac.roles.is_empty() {
            return Ok(PermissionCheck::allow_all());
        }

        let Some(permissions) = rbac.roles.get(role) else {
            return Ok(PermissionCheck::deny(files.to_vec()));
        };

        let rules = CompiledPermissions::compile(permissions);
        let denied = files
            .iter()
            .filter(|file| !rules.allows(file))
            .cloned()
            .collect();
        Ok(PermissionCheck::deny(denied))
    }
}

/// Write permissions with patterns compiled once per check.
struct CompiledPermissions {
    allow: Vec<PathPattern>,
    deny: Vec<PathPattern>,
}

impl CompiledPermissions {
    fn compile(permissions: &RolePermissions) -> Self {
        Self {
            allow: permissions.allow_write.iter().map(|p| PathPattern::new(p)).collect(),
            deny: permissions.deny_write.iter().map(|p| PathPattern::new(p)).collect(),
        }
    }

    /// Deny wins; an empty allow list permits everything not denied.
    fn allows(&self, file: &str) -> bool {
        let file = normalize(file);
        if self.deny.iter().any(|p| p.matches(&file)) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|p| p.matches(&file))
    }
}

/// A single allow/deny pattern.
enum PathPattern {
    /// Glob with `*`/`?`/`[`; `*` stays within one path segment, `**` spans any.
    Glob(GlobMatcher),
    /// Trailing-slash directory prefix (`docs/`).
    Prefix(String),
    /// Exact path, or a directory containing the path.
    Path(String),
    /// Pattern that failed to compile; never matches.
    Invalid,
}

impl PathPattern {
    fn new(raw: &str) -> Self {
        let pattern = normalize(raw);
        if pattern.contains(['*', '?', '[']) {
            match GlobBuilder::new(&pattern).literal_separator(true).build() {
                Ok(glob) => PathPattern::Glob(glob.compile_matcher()),
                Err(e) => {
                    debug!(pattern = %pattern, error = %e, "ignoring invalid rbac pattern");
                    PathPattern::Invalid
                }
            }
        } else if pattern.ends_with('/') {
            PathPattern::Prefix(pattern)
        } else {
            PathPattern::Path(pattern)
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Glob(glob) => glob.is_match(path),
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathPattern::Path(exact) => {
                path == exact
                    || path
                        .strip_prefix(exact.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            PathPattern::Invalid => false,
        }
    }
}

fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").map(str::to_string).unwrap_or(path)
}

/// In-memory role store for tests.
///
/// Denies the files registered with [`StaticRoleStore::deny`] and records
/// every permission query.
#[derive(Debug, Default)]
pub struct StaticRoleStore {
    role: Option<String>,
    denied: HashSet<String>,
    fail_checks: bool,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl StaticRoleStore {
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..Self::default()
        }
    }

    /// A store whose role cannot be resolved.
    pub fn without_role() -> Self {
        Self::default()
    }

    pub fn deny(mut self, file: impl Into<String>) -> Self {
        self.denied.insert(file.into());
        self
    }

    /// Make every permission check fail.
    pub fn failing(mut self) -> Self {
        self.fail_checks = true;
        self
    }

    /// Permission queries received so far, as `(role, files)` pairs.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl RoleStore for StaticRoleStore {
    fn current_role(&self) -> Result<String, RbacError> {
        self.role
            .clone()
            .ok_or_else(|| RbacError::RoleUnavailable("no role configured".to_string()))
    }

    fn validate_file_permissions(
        &self,
        role: &str,
        files: &[String],
    ) -> Result<PermissionCheck, RbacError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((role.to_string(), files.to_vec()));
        }
        if self.fail_checks {
            return Err(RbacError::PolicyUnavailable("static store failure".to_string()));
        }
        let denied = files
            .iter()
            .filter(|f| self.denied.contains(f.as_str()))
            .cloned()
            .collect();
        Ok(PermissionCheck::deny(denied))
    }
}
