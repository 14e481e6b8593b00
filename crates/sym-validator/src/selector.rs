//! Per-rule change filtering.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

use sym_core::language::{canonical_language, language_from_path};
use sym_core::policy::Selector;

/// A rule's `when` selector, compiled once per pass.
///
/// `languages`, `include` and `exclude` are evaluated. `branches`, `roles`
/// and `tags` are ignored since a change list carries none of that context.
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    languages: Vec<String>,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl ChangeFilter {
    /// `None` matches every file.
    pub fn new(selector: Option<&Selector>) -> Self {
        let Some(selector) = selector else {
            return Self::default();
        };
        Self {
            languages: selector.languages.iter().map(|l| canonical_language(l)).collect(),
            include: compile(&selector.include),
            exclude: compile(&selector.exclude),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        if !self.languages.is_empty() {
            let Some(lang) = language_from_path(path) else {
                return false;
            };
            if !self.languages.iter().any(|l| l == lang) {
                return false;
            }
        }
        if let Some(include) = &self.include {
            if !include.is_match(path) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(path) {
                return false;
            }
        }
        true
    }
}

fn compile(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!(pattern = %pattern, error = %e, "ignoring invalid selector glob"),
        }
    }
    match builder.build() {
        Ok(set) => Some(set),
        Err(e) => {
            warn!(error = %e, "failed to build selector globset");
            None
        }
    }
}
