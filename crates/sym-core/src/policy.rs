//! Code policy schema: rules, selectors and enforcement settings.
//!
//! A [`CodePolicy`] is loaded once and shared read-only across a validation
//! pass. Each [`PolicyRule`] names its enforcement engine inside the opaque
//! `check` map (`check["engine"]`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SymError};

/// Key inside `PolicyRule::check` that names the enforcement engine.
pub const ENGINE_KEY: &str = "engine";

/// The formal validation policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodePolicy {
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectInfo>,

    #[serde(default)]
    pub rules: Vec<PolicyRule>,

    #[serde(default)]
    pub enforce: EnforceSettings,
}

impl CodePolicy {
    /// Parse a policy from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a policy from a JSON file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SymError::InvalidPolicy(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Whether RBAC enforcement is switched on.
    pub fn rbac_enabled(&self) -> bool {
        self.enforce.rbac.as_ref().is_some_and(|r| r.enabled)
    }

    /// Rules that are enabled, in declaration order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &PolicyRule> {
        self.rules.iter().filter(|r| r.enabled)
    }
}

/// Project metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
}

/// A single enforceable rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyRule {
    pub id: String,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub severity: String,

    /// Natural-language description of the convention.
    #[serde(default, rename = "desc", skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Engine-specific configuration. Opaque to the validator apart from `engine`.
    #[serde(default)]
    pub check: Map<String, Value>,

    /// Per-rule file filter. `None` applies the rule to every change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Selector>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl PolicyRule {
    /// Create an enabled rule delegating to `engine`.
    pub fn new(id: impl Into<String>, engine: impl Into<String>) -> Self {
        let mut check = Map::new();
        check.insert(ENGINE_KEY.to_string(), Value::String(engine.into()));
        Self {
            id: id.into(),
            enabled: true,
            severity: "error".to_string(),
            check,
            ..Self::default()
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = severity.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.when = Some(selector);
        self
    }

    pub fn with_check(mut self, key: impl Into<String>, value: Value) -> Self {
        self.check.insert(key.into(), value);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Conditions restricting which changed files a rule applies to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Selector {
    pub fn languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Enforcement configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnforceSettings {
    #[serde(default)]
    pub stages: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fail_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbac: Option<RbacEnforce>,
}

/// RBAC enforcement switch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RbacEnforce {
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_violation: Option<String>,
}

/// Write permissions for one role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissions {
    #[serde(default)]
    pub allow_write: Vec<String>,

    #[serde(default)]
    pub deny_write: Vec<String>,
}

/// Role definitions from the user-facing policy (`.sym/user-policy.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRbac {
    #[serde(default)]
    pub roles: BTreeMap<String, RolePermissions>,
}

/// The parts of the user-facing policy the validator consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPolicy {
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbac: Option<UserRbac>,
}

impl UserPolicy {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
