//! Leveled executor: runs a dependency graph level by level.
//!
//! Every task of a level is dispatched to a bounded worker pool and the level
//! blocks until all of them finish. The first failure in a level stops the
//! run after that level drains; results already produced are returned with
//! the error. Cancellation is observed between levels and handed to every
//! task so in-flight work can stop on its own.

use crate::error::{ApiError, TaskError};
use crate::graph::DependencyGraph;
use crate::scheduler::cancel::CancellationSignal;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Payloads that can opt out of running alongside their level siblings.
pub trait Schedulable {
    fn runs_alongside_siblings(&self) -> bool {
        true
    }
}

impl Schedulable for () {}
impl Schedulable for String {}

/// Executes one task payload.
#[async_trait]
pub trait TaskRunner<T: Send + Sync>: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    async fn run(
        &self,
        task_id: &str,
        task: &T,
        cancel: &CancellationSignal,
    ) -> Result<Self::Output, ApiError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Upper bound on tasks running at once within a level.
    pub max_concurrency: usize,
    /// Per-task timeout layered under the run-wide cancellation signal.
    pub task_timeout: Option<Duration>,
}

impl SchedulerConfig {
    pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

    pub fn with_concurrency(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            ..Self::default()
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: Self::DEFAULT_MAX_CONCURRENCY,
            task_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskResult<R> {
    pub task_id: String,
    pub level: usize,
    pub output: R,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelSummary {
    pub level_index: usize,
    pub total_count: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
}

/// Worker counters shared by the tasks of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerStats {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub active: usize,
    pub high_water_mark: usize,
}

/// A task that ran and failed, with its error rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedTask {
    pub task_id: String,
    pub level: usize,
    pub error: String,
}

#[derive(Debug)]
pub struct ScheduleOutcome<R> {
    pub results: Vec<TaskResult<R>>,
    pub failed: Vec<FailedTask>,
    pub levels: Vec<LevelSummary>,
    pub stats: WorkerStats,
    pub duration_ms: u64,
}

/// A failed run: the error plus everything produced before it.
#[derive(Debug)]
pub struct SchedulerFailure<R> {
    pub error: ApiError,
    pub partial: ScheduleOutcome<R>,
}

impl<R> SchedulerFailure<R> {
    fn before_start(error: ApiError) -> Self {
        Self {
            error,
            partial: ScheduleOutcome {
                results: Vec::new(),
                failed: Vec::new(),
                levels: Vec::new(),
                stats: WorkerStats::default(),
                duration_ms: 0,
            },
        }
    }
}

/// Shared per-run state mutated by concurrent workers.
struct RunState<R> {
    completed: RwLock<HashSet<String>>,
    results: RwLock<Vec<TaskResult<R>>>,
    stats: Mutex<WorkerStats>,
}

pub struct LeveledScheduler {
    config: SchedulerConfig,
}

impl Default for LeveledScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl LeveledScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config: SchedulerConfig {
                max_concurrency: config.max_concurrency.max(1),
                ..config
            },
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub async fn execute<T, Rn>(
        &self,
        mut graph: DependencyGraph<T>,
        runner: Arc<Rn>,
        cancel: &CancellationSignal,
    ) -> Result<ScheduleOutcome<Rn::Output>, SchedulerFailure<Rn::Output>>
    where
        T: Schedulable + Send + Sync + 'static,
        Rn: TaskRunner<T>,
    {
        let started = Instant::now();
        if let Err(err) = graph.validate() {
            return Err(SchedulerFailure::before_start(ApiError::Graph(err)));
        }

        let levels = graph.levels();
        let known_ids: Arc<HashSet<String>> = Arc::new(graph.ids().map(str::to_string).collect());
        let mut payloads: std::collections::HashMap<String, (Arc<T>, Vec<String>)> = graph
            .into_nodes()
            .map(|node| (node.id, (Arc::new(node.payload), node.dependencies)))
            .collect();

        let limit = self.config.max_concurrency;
        let semaphore = Arc::new(Semaphore::new(limit));
        let run_state: Arc<RunState<Rn::Output>> = Arc::new(RunState {
            completed: RwLock::new(HashSet::new()),
            results: RwLock::new(Vec::new()),
            stats: Mutex::new(WorkerStats::default()),
        });
        let mut summaries: Vec<LevelSummary> = Vec::with_capacity(levels.len());
        let mut failed: Vec<FailedTask> = Vec::new();

        info!(
            total_levels = levels.len(),
            total_tasks = known_ids.len(),
            max_concurrency = limit,
            "Scheduling run started"
        );

        for (level_index, level_ids) in levels.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(level_index, "Cancellation observed; not starting level");
                return Err(Self::fail(
                    ApiError::Cancelled,
                    &run_state,
                    failed,
                    summaries,
                    started,
                ));
            }

            info!(level_index, task_count = level_ids.len(), "Level started");
            let mut handles = FuturesUnordered::new();
            for task_id in level_ids {
                let Some((payload, dependencies)) = payloads.remove(task_id) else {
                    continue;
                };
                let exclusive = !payload.runs_alongside_siblings();
                let worker = Worker {
                    task_id: task_id.clone(),
                    level: level_index,
                    payload,
                    dependencies,
                    known_ids: Arc::clone(&known_ids),
                    runner: Arc::clone(&runner),
                    run_state: Arc::clone(&run_state),
                    semaphore: Arc::clone(&semaphore),
                    permits: if exclusive { limit } else { 1 },
                    cancel: cancel.clone(),
                    timeout: self.config.task_timeout,
                };
                run_state.stats.lock().dispatched += 1;
                let id = task_id.clone();
                let handle = tokio::spawn(worker.run());
                handles.push(async move { (id, handle.await) });
            }

            let mut first_error: Option<ApiError> = None;
            let mut succeeded_count = 0usize;
            let mut failed_count = 0usize;
            // Drain the whole level: in-flight siblings finish and keep their results.
            while let Some((task_id, joined)) = handles.next().await {
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(join_err) => Err(ApiError::Task(TaskError::Panicked {
                        task_id: task_id.clone(),
                        message: join_err.to_string(),
                    })),
                };
                match outcome {
                    Ok(()) => succeeded_count += 1,
                    Err(err) => {
                        failed_count += 1;
                        warn!(level_index, task_id = %task_id, error = %err, "Task failed");
                        failed.push(FailedTask {
                            task_id: task_id.clone(),
                            level: level_index,
                            error: err.to_string(),
                        });
                        // Cancellation outranks ordinary failures so callers can resume.
                        let replace = match &first_error {
                            None => true,
                            Some(existing) => err.is_cancelled() && !existing.is_cancelled(),
                        };
                        if replace {
                            first_error = Some(err);
                        }
                    }
                }
            }

            summaries.push(LevelSummary {
                level_index,
                total_count: level_ids.len(),
                succeeded_count,
                failed_count,
            });
            info!(level_index, succeeded_count, failed_count, "Level completed");

            if let Some(err) = first_error {
                let err = if cancel.is_cancelled() {
                    ApiError::Cancelled
                } else {
                    err
                };
                return Err(Self::fail(err, &run_state, failed, summaries, started));
            }
        }

        let outcome = Self::collect(&run_state, failed, summaries, started);
        info!(
            completed = outcome.results.len(),
            duration_ms = outcome.duration_ms,
            "Scheduling run completed"
        );
        Ok(outcome)
    }

    fn collect<R>(
        run_state: &RunState<R>,
        failed: Vec<FailedTask>,
        levels: Vec<LevelSummary>,
        started: Instant,
    ) -> ScheduleOutcome<R> {
        ScheduleOutcome {
            results: std::mem::take(&mut *run_state.results.write()),
            failed,
            levels,
            stats: run_state.stats.lock().clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn fail<R>(
        error: ApiError,
        run_state: &RunState<R>,
        failed: Vec<FailedTask>,
        levels: Vec<LevelSummary>,
        started: Instant,
    ) -> SchedulerFailure<R> {
        SchedulerFailure {
            error,
            partial: Self::collect(run_state, failed, levels, started),
        }
    }
}

/// One dispatched task with everything it needs on its own Tokio task.
struct Worker<T, Rn>
where
    T: Send + Sync,
    Rn: TaskRunner<T>,
{
    task_id: String,
    level: usize,
    payload: Arc<T>,
    dependencies: Vec<String>,
    known_ids: Arc<HashSet<String>>,
    runner: Arc<Rn>,
    run_state: Arc<RunState<Rn::Output>>,
    semaphore: Arc<Semaphore>,
    permits: usize,
    cancel: CancellationSignal,
    timeout: Option<Duration>,
}

impl<T, Rn> Worker<T, Rn>
where
    T: Send + Sync + 'static,
    Rn: TaskRunner<T>,
{
    async fn run(self) -> Result<(), ApiError> {
        let _permit = Arc::clone(&self.semaphore)
            .acquire_many_owned(self.permits as u32)
            .await
            .map_err(|_| ApiError::Cancelled)?;

        if self.cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        {
            let completed = self.run_state.completed.read();
            for dep in &self.dependencies {
                if self.known_ids.contains(dep) && !completed.contains(dep) {
                    return Err(ApiError::Task(TaskError::DependencyNotCompleted {
                        task_id: self.task_id.clone(),
                        dependency: dep.clone(),
                    }));
                }
            }
        }

        {
            let mut stats = self.run_state.stats.lock();
            stats.active += 1;
            stats.high_water_mark = stats.high_water_mark.max(stats.active);
        }
        debug!(task_id = %self.task_id, level = self.level, "Task started");

        let outcome = self.invoke().await;

        let mut stats = self.run_state.stats.lock();
        stats.active -= 1;
        match outcome {
            Ok(output) => {
                stats.succeeded += 1;
                drop(stats);
                self.run_state.results.write().push(TaskResult {
                    task_id: self.task_id.clone(),
                    level: self.level,
                    output,
                });
                self.run_state.completed.write().insert(self.task_id.clone());
                debug!(task_id = %self.task_id, "Task completed");
                Ok(())
            }
            Err(err) => {
                stats.failed += 1;
                Err(err)
            }
        }
    }

    async fn invoke(&self) -> Result<Rn::Output, ApiError> {
        let call = self.runner.run(&self.task_id, &self.payload, &self.cancel);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(ApiError::Task(TaskError::Timeout {
                        task_id: self.task_id.clone(),
                        timeout_ms: limit.as_millis() as u64,
                    }))
                }
            },
            None => call.await,
        };
        result.map_err(|err| match err {
            ApiError::Cancelled | ApiError::Task(_) => err,
            other => ApiError::Task(TaskError::Failed {
                task_id: self.task_id.clone(),
                message: other.to_string(),
            }),
        })
    }
}
