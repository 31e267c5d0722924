//! Machine-readable run report.

use crate::cache::CacheStats;
use crate::change::ChangeSet;
use crate::error::ApiError;
use crate::orchestrator::patch::Patch;
use crate::orchestrator::runner::GeneratedFile;
use crate::orchestrator::RegenerationMode;
use crate::scheduler::{FailedTask, LevelSummary, ScheduleOutcome, WorkerStats};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RegenerationMode,
    pub change_set: ChangeSet,
    /// Generated files, in scheduler result order.
    pub patches: Vec<Patch>,
    /// Target paths that did not need to run.
    pub skipped: Vec<String>,
    /// Files dropped from the state because no task produces them any more.
    pub removed: Vec<String>,
    pub failed: Vec<FailedTask>,
    /// Target paths whose context fell back to the whole specification.
    pub degraded_contexts: Vec<String>,
    pub levels: Vec<LevelSummary>,
    pub stats: WorkerStats,
    pub cache: CacheStats,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_error: Option<String>,
}

impl RunReport {
    pub(crate) fn new(change_set: ChangeSet, mode: &RegenerationMode) -> Self {
        Self {
            mode: mode.clone(),
            change_set,
            patches: Vec::new(),
            skipped: Vec::new(),
            removed: Vec::new(),
            failed: Vec::new(),
            degraded_contexts: Vec::new(),
            levels: Vec::new(),
            stats: WorkerStats::default(),
            cache: CacheStats::default(),
            duration_ms: 0,
            state_error: None,
        }
    }

    pub(crate) fn absorb(&mut self, outcome: ScheduleOutcome<GeneratedFile>, cache: CacheStats) {
        for result in outcome.results {
            if result.output.degraded {
                self.degraded_contexts
                    .push(result.output.patch.target_path.clone());
            }
            self.patches.push(result.output.patch);
        }
        self.failed = outcome.failed;
        self.levels = outcome.levels;
        self.stats = outcome.stats;
        self.duration_ms = outcome.duration_ms;
        self.cache = cache;
    }

    pub fn generated_paths(&self) -> impl Iterator<Item = &str> {
        self.patches.iter().map(|p| p.target_path.as_str())
    }
}

/// A run that did not complete. `report` holds whatever was produced and is
/// absent when the run failed before scheduling started.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: ApiError,
    pub report: Option<RunReport>,
}

impl RunFailure {
    pub(crate) fn before_start(error: ApiError) -> Self {
        Self {
            error,
            report: None,
        }
    }

    pub(crate) fn new(error: ApiError, report: RunReport) -> Self {
        Self {
            error,
            report: Some(report),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error.is_cancelled()
    }
}
