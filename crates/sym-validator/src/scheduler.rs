//! Bounded-concurrency execution of units.
//!
//! One tokio task per unit, gated by a semaphore. Outcomes land in a shared
//! accumulator that is locked only while appending.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::{Mutex, Semaphore};
use tracing::Instrument;

use sym_core::obs::{emit_unit_failed, emit_unit_finished};
use sym_core::violation::{ValidationError, Violation};

use crate::error::ValidatorError;
use crate::unit::{ExecutionUnit, UnitContext};

/// Violations and unit errors collected from one scheduling run.
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    pub violations: Vec<Violation>,
    pub errors: Vec<ValidationError>,
}

impl ScheduleOutcome {
    fn record_error(&mut self, unit_rule_ids: Vec<String>, engine: &str, error: &ValidatorError) {
        emit_unit_failed(engine, &unit_rule_ids, error);
        self.errors.push(ValidationError {
            rule_ids: unit_rule_ids,
            engine: engine.to_string(),
            message: error.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    concurrency: usize,
    deadline: Duration,
}

impl Scheduler {
    /// `concurrency` is raised to at least one.
    pub fn new(concurrency: usize, deadline: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            deadline,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every unit to completion or until the pass deadline.
    ///
    /// A failing, panicking or expired unit is recorded as an error and
    /// never stops the others.
    pub async fn run(&self, units: Vec<ExecutionUnit>, ctx: Arc<UnitContext>) -> ScheduleOutcome {
        let deadline = tokio::time::Instant::now() + self.deadline;
        let deadline_ms = self.deadline.as_millis() as u64;
        let outcome = Arc::new(Mutex::new(ScheduleOutcome::default()));
        let sem = Arc::new(Semaphore::new(self.concurrency));

        let mut tasks = Vec::with_capacity(units.len());
        let mut task_meta = Vec::with_capacity(units.len());

        for unit in units {
            let ctx = Arc::clone(&ctx);
            let outcome = Arc::clone(&outcome);
            let sem = Arc::clone(&sem);
            task_meta.push((unit.engine_name().to_string(), unit.rule_ids()));

            let task = tokio::spawn(
                async move {
                    let started = Instant::now();
                    let run = async {
                        let _permit = sem.acquire_owned().await.ok();
                        unit.execute(&ctx).await
                    };
                    let result = match tokio::time::timeout_at(deadline, run).await {
                        Ok(result) => result,
                        Err(_) => Err(ValidatorError::DeadlineExceeded(deadline_ms)),
                    };

                    match result {
                        Ok(violations) => {
                            emit_unit_finished(
                                unit.engine_name(),
                                unit.files().len(),
                                violations.len(),
                                started.elapsed().as_millis() as u64,
                            );
                            outcome.lock().await.violations.extend(violations);
                        }
                        Err(e) => {
                            outcome
                                .lock()
                                .await
                                .record_error(unit.rule_ids(), unit.engine_name(), &e);
                        }
                    }
                }
                .in_current_span(),
            );
            tasks.push(task);
        }

        let joined = join_all(tasks).await;
        let mut outcome = {
            let mut guard = outcome.lock().await;
            std::mem::take(&mut *guard)
        };
        for (joined, (engine, rule_ids)) in joined.into_iter().zip(task_meta) {
            if let Err(e) = joined {
                outcome.record_error(rule_ids, &engine, &ValidatorError::TaskFailed(e.to_string()));
            }
        }
        outcome
    }
}
