//! Execution units: independently schedulable pieces of validation work.
//!
//! The unit builder picks a batching strategy per rule group. Linter
//! engines get one batched invocation; the LLM engine gets either one
//! bundled agentic review or one call per (rule, change) pair, depending
//! on the provider's declared execution mode.

mod agentic_llm;
mod linter;
mod parallel_llm;

use std::path::PathBuf;
use std::sync::Arc;

use sym_core::violation::Violation;
use sym_linter::LinterRegistry;
use sym_llm::{ExecutionMode, Provider};
use tracing::debug;

use crate::classifier::{classify, EngineClass, LLM_ENGINE};
use crate::error::ValidatorResult;
use crate::grouper::RuleGroup;

pub use agentic_llm::AgenticLlmUnit;
pub use linter::LinterUnit;
pub use parallel_llm::ParallelLlmUnit;

/// Read-only collaborators shared by every unit in a pass.
#[derive(Clone)]
pub struct UnitContext {
    pub linters: Arc<LinterRegistry>,
    pub provider: Option<Arc<dyn Provider>>,
    /// Repository root; linter configs are looked up under `<work_dir>/.sym`.
    pub work_dir: PathBuf,
    pub tools_dir: PathBuf,
}

impl UnitContext {
    fn llm_mode(&self) -> Option<ExecutionMode> {
        self.provider.as_ref().and_then(|p| p.info().mode)
    }
}

impl std::fmt::Debug for UnitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitContext")
            .field("linters", &self.linters)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("work_dir", &self.work_dir)
            .field("tools_dir", &self.tools_dir)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum ExecutionUnit {
    Linter(LinterUnit),
    ParallelLlm(ParallelLlmUnit),
    AgenticLlm(AgenticLlmUnit),
}

impl ExecutionUnit {
    pub async fn execute(&self, ctx: &UnitContext) -> ValidatorResult<Vec<Violation>> {
        match self {
            ExecutionUnit::Linter(unit) => unit.execute(ctx).await,
            ExecutionUnit::ParallelLlm(unit) => unit.execute(ctx).await,
            ExecutionUnit::AgenticLlm(unit) => unit.execute(ctx).await,
        }
    }

    pub fn rule_ids(&self) -> Vec<String> {
        match self {
            ExecutionUnit::Linter(unit) => unit.rules.iter().map(|r| r.id.clone()).collect(),
            ExecutionUnit::ParallelLlm(unit) => vec![unit.rule.id.clone()],
            ExecutionUnit::AgenticLlm(unit) => unit.rules.iter().map(|r| r.id.clone()).collect(),
        }
    }

    pub fn engine_name(&self) -> &str {
        match self {
            ExecutionUnit::Linter(unit) => &unit.engine,
            ExecutionUnit::ParallelLlm(_) | ExecutionUnit::AgenticLlm(_) => LLM_ENGINE,
        }
    }

    /// Files this unit checks. Never includes deleted files.
    pub fn files(&self) -> Vec<String> {
        match self {
            ExecutionUnit::Linter(unit) => unit.files.clone(),
            ExecutionUnit::ParallelLlm(unit) => vec![unit.change.file_path.clone()],
            ExecutionUnit::AgenticLlm(unit) => unit.files(),
        }
    }
}

/// The unit file a reported path refers to. Linters and models may report
/// absolute or `./`-prefixed paths; a suffix only counts at a separator.
pub(crate) fn resolve_unit_file<'a>(files: &'a [String], reported: &str) -> Option<&'a str> {
    let reported = reported.strip_prefix("./").unwrap_or(reported);
    files
        .iter()
        .find(|f| f.as_str() == reported)
        .or_else(|| {
            files.iter().find(|f| {
                reported
                    .strip_suffix(f.as_str())
                    .is_some_and(|head| head.ends_with('/') || head.ends_with('\\'))
            })
        })
        .map(String::as_str)
}

/// Turn rule groups into execution units.
pub fn build_units(groups: Vec<RuleGroup>, ctx: &UnitContext) -> Vec<ExecutionUnit> {
    let mut units = Vec::new();
    for group in groups {
        if group.rules.is_empty() {
            continue;
        }
        match classify(&group.engine) {
            EngineClass::Linter => {
                if group.files.is_empty() {
                    continue;
                }
                units.push(ExecutionUnit::Linter(LinterUnit {
                    engine: group.engine,
                    rules: group.rules,
                    files: group.files.into_iter().collect(),
                }));
            }
            EngineClass::Llm => {
                let changes: Vec<_> = group.changes.into_iter().filter(|c| !c.is_deleted()).collect();
                if changes.is_empty() {
                    continue;
                }
                match ctx.llm_mode() {
                    Some(ExecutionMode::AgenticSingle) => {
                        debug!(rules = group.rules.len(), files = changes.len(), "bundling LLM rules into one agentic unit");
                        units.push(ExecutionUnit::AgenticLlm(AgenticLlmUnit {
                            rules: group.rules,
                            changes,
                        }));
                    }
                    Some(ExecutionMode::ParallelApi) | None => {
                        for rule in &group.rules {
                            for change in &changes {
                                units.push(ExecutionUnit::ParallelLlm(ParallelLlmUnit {
                                    rule: rule.clone(),
                                    change: change.clone(),
                                }));
                            }
                        }
                    }
                }
            }
        }
    }
    units
}
