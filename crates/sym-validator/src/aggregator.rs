//! Final result assembly.

use std::collections::HashSet;

use indexmap::IndexSet;

use sym_core::violation::{ValidationError, ValidationResult, Violation};

use crate::unit::ExecutionUnit;

/// Distinct files covered by `units`, in first-seen order.
pub fn checked_files(units: &[ExecutionUnit]) -> IndexSet<String> {
    units.iter().flat_map(|u| u.files()).collect()
}

/// Merge RBAC and unit outcomes into one result.
///
/// `checked` is the union of unit files plus any file the RBAC gate denied,
/// so every violation file is a checked file. `failed` counts distinct
/// violation files, and `passed` the checked files with no violation.
pub fn aggregate(
    mut checked: IndexSet<String>,
    rbac_violations: Vec<Violation>,
    unit_violations: Vec<Violation>,
    errors: Vec<ValidationError>,
) -> ValidationResult {
    checked.extend(rbac_violations.iter().map(|v| v.file.clone()));
    let mut violations = rbac_violations;
    violations.extend(unit_violations);

    let failed: HashSet<&str> = violations.iter().map(|v| v.file.as_str()).collect();
    let passed = checked.iter().filter(|f| !failed.contains(f.as_str())).count();

    ValidationResult {
        checked: checked.len(),
        passed,
        failed: failed.len(),
        violations,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::LinterUnit;
    use sym_core::policy::PolicyRule;

    fn violation(file: &str) -> Violation {
        Violation {
            rule_id: "r".to_string(),
            file: file.to_string(),
            ..Violation::default()
        }
    }

    #[test]
    fn test_counts_from_distinct_files() {
        let units = vec![
            ExecutionUnit::Linter(LinterUnit {
                engine: "eslint".to_string(),
                rules: vec![PolicyRule::new("r", "eslint")],
                files: vec!["a.js".to_string(), "b.js".to_string()],
            }),
            ExecutionUnit::Linter(LinterUnit {
                engine: "tsc".to_string(),
                rules: vec![PolicyRule::new("t", "tsc")],
                files: vec!["b.js".to_string(), "c.ts".to_string()],
            }),
        ];
        let checked = checked_files(&units);
        assert_eq!(checked.len(), 3);

        let result = aggregate(
            checked,
            vec![],
            vec![violation("a.js"), violation("a.js"), violation("c.ts")],
            vec![],
        );
        assert_eq!(result.checked, 3);
        assert_eq!(result.failed, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.violations.len(), 3);
    }

    #[test]
    fn test_rbac_violations_come_first() {
        let checked: IndexSet<String> = ["a.js".to_string()].into_iter().collect();
        let result = aggregate(checked, vec![violation("a.js")], vec![violation("a.js")], vec![]);
        assert_eq!(result.violations.len(), 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.passed, 0);
    }

    #[test]
    fn test_rbac_only_file_counts_as_checked() {
        let checked: IndexSet<String> = ["main.go".to_string()].into_iter().collect();
        let result = aggregate(checked, vec![violation("secret.go")], vec![], vec![]);
        assert_eq!(result.checked, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.passed, 1);
    }

    #[test]
    fn test_empty_pass() {
        let result = aggregate(IndexSet::new(), vec![], vec![], vec![]);
        assert_eq!(result, ValidationResult::default());
    }
}
