//! Validation orchestration core.
//!
//! A pass runs the RBAC gate, groups enabled rules by engine, turns each
//! group into execution units, runs the units under bounded concurrency and
//! a pass deadline, then aggregates violations, unit errors and file counts
//! into one [`ValidationResult`](sym_core::ValidationResult).

pub mod aggregator;
pub mod classifier;
pub mod error;
pub mod grouper;
pub mod rbac_gate;
pub mod response;
pub mod scheduler;
pub mod selector;
pub mod unit;
pub mod validator;

pub use classifier::{classify, engine_of, EngineClass, LLM_ENGINE};
pub use error::{ValidatorError, ValidatorResult};
pub use grouper::{group_rules, RuleGroup};
pub use scheduler::{ScheduleOutcome, Scheduler};
pub use unit::{build_units, AgenticLlmUnit, ExecutionUnit, LinterUnit, ParallelLlmUnit, UnitContext};
pub use validator::Validator;
