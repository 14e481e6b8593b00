//! Partition enabled rules into per-engine groups.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use sym_core::change::Change;
use sym_core::policy::{CodePolicy, PolicyRule};

use crate::classifier::{classify, engine_of, EngineClass};
use crate::selector::ChangeFilter;

/// Rules sharing one engine, with the files they touch.
///
/// Built once per validation pass and consumed by the unit builder.
#[derive(Debug, Clone, Default)]
pub struct RuleGroup {
    pub engine: String,
    /// In policy order.
    pub rules: Vec<PolicyRule>,
    /// Distinct non-deleted files, in first-seen order.
    pub files: IndexSet<String>,
    /// Only filled for the LLM engine, one entry per file path.
    pub changes: Vec<Change>,
}

impl RuleGroup {
    fn new(engine: &str) -> Self {
        Self {
            engine: engine.to_string(),
            ..Self::default()
        }
    }

    pub fn rule_ids(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.id.clone()).collect()
    }
}

/// Group the policy's enabled rules by engine.
///
/// Rules with no engine or no matching change are left out. Groups come
/// back in the order their engine was first seen, so identical input always
/// yields identical groups.
pub fn group_rules(policy: &CodePolicy, changes: &[Change]) -> Vec<RuleGroup> {
    let live: Vec<&Change> = changes.iter().filter(|c| !c.is_deleted()).collect();
    let mut groups: IndexMap<String, RuleGroup> = IndexMap::new();

    for rule in policy.enabled_rules() {
        let Some(engine) = engine_of(rule) else {
            debug!(rule_id = %rule.id, "skipping rule without engine");
            continue;
        };

        let filter = ChangeFilter::new(rule.when.as_ref());
        let matched: Vec<&Change> = live
            .iter()
            .copied()
            .filter(|c| filter.matches(&c.file_path))
            .collect();
        if matched.is_empty() {
            debug!(rule_id = %rule.id, engine, "no changes match rule");
            continue;
        }

        let group = groups
            .entry(engine.to_string())
            .or_insert_with(|| RuleGroup::new(engine));
        group.rules.push(rule.clone());
        group
            .files
            .extend(matched.iter().map(|c| c.file_path.clone()));

        if classify(engine) == EngineClass::Llm {
            for change in matched {
                if !group.changes.iter().any(|c| c.file_path == change.file_path) {
                    group.changes.push(change.clone());
                }
            }
        }
    }

    groups.into_values().collect()
}
