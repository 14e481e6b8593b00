//! Symphony core: policy schema, change model, results, RBAC and plumbing
//! shared by the linter, LLM and validator crates.

pub mod change;
pub mod config;
pub mod error;
pub mod git;
pub mod language;
pub mod obs;
pub mod policy;
pub mod rbac;
pub mod telemetry;
pub mod violation;

pub use change::{extract_added_lines, Change, ChangeStatus};
pub use config::{
    default_concurrency, default_tools_dir, ExecutionMode, ProviderOverrides, ProviderSettings,
    SymConfig,
};
pub use error::{Result, SymError};
pub use language::{canonical_language, language_from_path};
pub use policy::{CodePolicy, PolicyRule, Selector, UserPolicy, ENGINE_KEY};
pub use rbac::{PermissionCheck, PolicyRoleStore, RbacError, RoleStore, StaticRoleStore};
pub use violation::{ValidationError, ValidationResult, Violation, RBAC_RULE_ID};
