//! Leveled scheduling: plan expansion, bounded level-by-level execution,
//! cancellation, and the deterministic-ordering wrapper.

pub mod cancel;
pub mod deterministic;
pub mod executor;
pub mod plan;

pub use cancel::CancellationSignal;
pub use deterministic::{DeterministicScheduler, TargetPath};
pub use executor::{
    FailedTask, LeveledScheduler, LevelSummary, Schedulable, ScheduleOutcome, SchedulerConfig,
    SchedulerFailure, TaskResult, TaskRunner, WorkerStats,
};
pub use plan::{ExecutionPlan, GenerationTask, PlanPhase, TaskKind};
