//! Deterministic-output wrapper around the leveled executor.
//!
//! Results come back in completion order from the executor; this wrapper
//! re-sorts them by target path (then task id) so repeated runs over the same
//! input yield identical ordering whatever the concurrency limit.

use crate::graph::DependencyGraph;
use crate::scheduler::cancel::CancellationSignal;
use crate::scheduler::executor::{
    LeveledScheduler, Schedulable, ScheduleOutcome, SchedulerConfig, SchedulerFailure, TaskResult,
    TaskRunner,
};
use std::sync::Arc;

/// Outputs that name the file they were produced for.
pub trait TargetPath {
    fn target_path(&self) -> &str;
}

impl TargetPath for String {
    fn target_path(&self) -> &str {
        self
    }
}

pub struct DeterministicScheduler {
    inner: LeveledScheduler,
}

impl DeterministicScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            inner: LeveledScheduler::new(config),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.inner.config()
    }

    pub async fn execute<T, Rn>(
        &self,
        graph: DependencyGraph<T>,
        runner: Arc<Rn>,
        cancel: &CancellationSignal,
    ) -> Result<ScheduleOutcome<Rn::Output>, SchedulerFailure<Rn::Output>>
    where
        T: Schedulable + Send + Sync + 'static,
        Rn: TaskRunner<T>,
        Rn::Output: TargetPath,
    {
        match self.inner.execute(graph, runner, cancel).await {
            Ok(mut outcome) => {
                sort_results(&mut outcome.results);
                Ok(outcome)
            }
            Err(mut failure) => {
                sort_results(&mut failure.partial.results);
                Err(failure)
            }
        }
    }
}

pub fn sort_results<R: TargetPath>(results: &mut [TaskResult<R>]) {
    results.sort_by(|a, b| {
        a.output
            .target_path()
            .cmp(b.output.target_path())
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
}
