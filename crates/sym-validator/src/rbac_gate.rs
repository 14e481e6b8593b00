//! Pre-flight write-permission check.

use tracing::{debug, warn};

use sym_core::change::Change;
use sym_core::policy::CodePolicy;
use sym_core::rbac::RoleStore;
use sym_core::violation::Violation;

/// One violation per non-deleted file the acting role may not modify.
///
/// Never fails: a missing role or an unreadable permission set means RBAC
/// does not apply to this pass.
pub fn check_permissions(
    policy: &CodePolicy,
    roles: &dyn RoleStore,
    changes: &[Change],
) -> Vec<Violation> {
    if !policy.rbac_enabled() {
        return Vec::new();
    }

    let files: Vec<String> = changes
        .iter()
        .filter(|c| !c.is_deleted())
        .map(|c| c.file_path.clone())
        .collect();
    if files.is_empty() {
        return Vec::new();
    }

    let role = match roles.current_role() {
        Ok(role) => role,
        Err(e) => {
            debug!(error = %e, "no current role, skipping RBAC");
            return Vec::new();
        }
    };

    match roles.validate_file_permissions(&role, &files) {
        Ok(check) if check.allowed => Vec::new(),
        Ok(check) => {
            debug!(role = %role, denied = check.denied_files.len(), "RBAC denied files");
            check
                .denied_files
                .into_iter()
                .map(|file| Violation::rbac_denied(&role, file))
                .collect()
        }
        Err(e) => {
            warn!(role = %role, error = %e, "RBAC check failed, skipping");
            Vec::new()
        }
    }
}
