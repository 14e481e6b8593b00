//! Engine-name to linter lookup.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::error::{LinterError, LinterResult};
use crate::eslint::EslintLinter;
use crate::types::Linter;

/// Linters keyed by engine name. Built once and shared read-only.
#[derive(Clone, Default)]
pub struct LinterRegistry {
    linters: BTreeMap<String, Arc<dyn Linter>>,
}

impl LinterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in linter.
    pub fn with_defaults(tools_dir: &Path, work_dir: &Path) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EslintLinter::new(tools_dir, work_dir)));
        registry
    }

    /// Register a linter under its name. Duplicate names keep the first.
    pub fn register(&mut self, linter: Arc<dyn Linter>) {
        let name = linter.name().to_string();
        if self.linters.contains_key(&name) {
            warn!(linter = %name, "linter already registered, ignoring duplicate");
            return;
        }
        self.linters.insert(name, linter);
    }

    pub fn get(&self, name: &str) -> LinterResult<Arc<dyn Linter>> {
        self.linters
            .get(name)
            .cloned()
            .ok_or_else(|| LinterError::NotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.linters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.linters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linters.is_empty()
    }
}

impl std::fmt::Debug for LinterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinterRegistry")
            .field("linters", &self.linters.keys().collect::<Vec<_>>())
            .finish()
    }
}
