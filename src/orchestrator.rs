//! End-to-end incremental generation.
//!
//! change detection → affected files → per-file context → scheduled
//! generation → state update for the files that succeeded.

pub mod patch;
pub mod report;
mod runner;

pub use patch::Patch;
pub use report::{RunFailure, RunReport};

use crate::cache::{CacheKey, RegenerationCache};
use crate::change::{detect_changes, ChangeSet};
use crate::config::ForgeConfig;
use crate::context::{ContextFilter, ContextOptions};
use crate::error::ApiError;
use crate::generator::{FileStore, Generator, LocalFileStore};
use crate::scheduler::{
    CancellationSignal, DeterministicScheduler, ExecutionPlan, LeveledScheduler, SchedulerConfig,
    SchedulerFailure, ScheduleOutcome, TaskKind,
};
use crate::spec::Specification;
use crate::state::{
    affected_files, content_from_diff, spec_checksum, IncrementalState, StateStore,
};
use runner::{GeneratedFile, GenerationRunner};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RegenerationMode {
    /// Every output file regenerates.
    Full,
    /// Only the listed files (plus files never generated before) regenerate.
    Incremental { affected: BTreeSet<String> },
    /// Nothing changed since the recorded snapshot.
    UpToDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegenerationDecision {
    pub change_set: ChangeSet,
    pub mode: RegenerationMode,
}

impl RegenerationDecision {
    /// Whether a task for `path` must run under this decision.
    pub fn requires(&self, path: &str, state: &IncrementalState) -> bool {
        match &self.mode {
            RegenerationMode::Full => true,
            RegenerationMode::Incremental { affected } => {
                affected.contains(path) || !state.knows_file(path)
            }
            RegenerationMode::UpToDate => !state.knows_file(path),
        }
    }
}

pub struct RunRequest {
    /// Previous snapshot; falls back to the one recorded in the state document.
    pub old: Option<Specification>,
    pub new: Specification,
    pub plan: ExecutionPlan,
    pub cancel: CancellationSignal,
}

impl RunRequest {
    pub fn new(new: Specification, plan: ExecutionPlan) -> Self {
        Self {
            old: None,
            new,
            plan,
            cancel: CancellationSignal::new(),
        }
    }

    pub fn with_old(mut self, old: Specification) -> Self {
        self.old = Some(old);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

pub struct Orchestrator {
    generator: Arc<dyn Generator>,
    state: StateStore,
    cache: Arc<RegenerationCache<Vec<String>>>,
    scheduler: SchedulerConfig,
    deterministic: bool,
    context: ContextOptions,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn Generator>, files: Arc<dyn FileStore>) -> Self {
        Self {
            generator,
            state: StateStore::with_default_location(files),
            cache: Arc::new(RegenerationCache::default()),
            scheduler: SchedulerConfig::default(),
            deterministic: true,
            context: ContextOptions::default(),
        }
    }

    /// Orchestrator over a local output directory, configured from `config`.
    pub fn from_config(
        config: &ForgeConfig,
        generator: Arc<dyn Generator>,
        output_dir: &Path,
    ) -> Self {
        let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(output_dir));
        Self {
            generator,
            state: StateStore::new(files, config.state.state_file.clone()),
            cache: Arc::new(config.cache.build()),
            scheduler: config.scheduler.to_scheduler_config(),
            deterministic: config.scheduler.deterministic,
            context: config.context.to_options(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_context_options(mut self, context: ContextOptions) -> Self {
        self.context = context;
        self
    }

    /// Share a cache across orchestrators.
    pub fn with_cache(mut self, cache: Arc<RegenerationCache<Vec<String>>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state
    }

    pub fn cache(&self) -> &RegenerationCache<Vec<String>> {
        &self.cache
    }

    /// Decide how much must regenerate. Full when there is no previous
    /// snapshot, a whole-section flag is set, or nothing was generated yet.
    pub fn plan_regeneration(
        old: Option<&Specification>,
        new: &Specification,
        state: &IncrementalState,
    ) -> RegenerationDecision {
        let change_set = detect_changes(old, new);
        let mode = if old.is_none()
            || change_set.requires_full_regeneration()
            || state.known_files().is_empty()
        {
            RegenerationMode::Full
        } else if !change_set.has_changes() {
            RegenerationMode::UpToDate
        } else {
            RegenerationMode::Incremental {
                affected: affected_files(state, &change_set),
            }
        };
        RegenerationDecision { change_set, mode }
    }

    /// Decision against the persisted state, without generating anything.
    pub fn preview(
        &self,
        old: Option<&Specification>,
        new: &Specification,
    ) -> Result<RegenerationDecision, ApiError> {
        let state = self.state.load()?;
        let old = old.or(state.previous_spec.as_ref());
        Ok(Self::plan_regeneration(old, new, &state))
    }

    pub fn clear_state(&self) -> Result<bool, ApiError> {
        self.cache.clear();
        Ok(self.state.clear()?)
    }

    pub async fn run(&self, request: RunRequest) -> Result<RunReport, RunFailure> {
        let RunRequest {
            old,
            new,
            plan,
            cancel,
        } = request;

        new.validate()
            .map_err(|e| RunFailure::before_start(e.into()))?;
        plan.validate()
            .map_err(|e| RunFailure::before_start(e.into()))?;

        let mut guard = self
            .state
            .lock_run()
            .await
            .map_err(|e| RunFailure::before_start(e.into()))?;

        let old = old.or_else(|| guard.state().previous_spec.clone());
        let decision = Self::plan_regeneration(old.as_ref(), &new, guard.state());
        let spec_hash = spec_checksum(&new);
        info!(
            mode = ?decision.mode,
            has_changes = decision.change_set.has_changes(),
            "Regeneration planned"
        );

        let mut report = RunReport::new(decision.change_set.clone(), &decision.mode);
        let mut selected: HashSet<String> = HashSet::new();
        let mut packages: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (_, task) in plan.tasks() {
            if task.kind != TaskKind::ProduceFile {
                continue;
            }
            let package = task.package_hint().unwrap_or_default();
            let state = guard.state();
            let cached = state.knows_file(&task.target_path)
                && self.cache.contains(&CacheKey::new(&spec_hash, &package));
            // Already produced from this exact snapshot by an earlier, failed run.
            let current = state.generated_from(&task.target_path, &spec_hash);
            if decision.requires(&task.target_path, state) && !cached && !current {
                selected.insert(task.id.clone());
                packages.entry(package).or_default().push(task.id.clone());
            } else {
                report.skipped.push(task.target_path.clone());
            }
        }

        let graph = plan
            .build_graph_filtered(|t| selected.contains(&t.id))
            .map_err(|e| RunFailure::before_start(e.into()))?;

        let known: Arc<HashSet<String>> =
            Arc::new(guard.state().known_files().into_iter().collect());
        let runner = Arc::new(GenerationRunner::new(
            Arc::clone(&self.generator),
            ContextFilter::new(Arc::new(new.clone()), self.context.clone()),
            known,
        ));

        let outcome = if graph.is_empty() {
            Ok(ScheduleOutcome {
                results: Vec::new(),
                failed: Vec::new(),
                levels: Vec::new(),
                stats: Default::default(),
                duration_ms: 0,
            })
        } else if self.deterministic {
            DeterministicScheduler::new(self.scheduler.clone())
                .execute(graph, runner, &cancel)
                .await
        } else {
            LeveledScheduler::new(self.scheduler.clone())
                .execute(graph, runner, &cancel)
                .await
        };

        let (outcome, error) = match outcome {
            Ok(outcome) => (outcome, None),
            Err(SchedulerFailure { error, partial }) => (partial, Some(error)),
        };

        let succeeded: HashSet<&str> = outcome.results.iter().map(|r| r.task_id.as_str()).collect();
        for result in &outcome.results {
            let file: &GeneratedFile = &result.output;
            guard.state_mut().record_generation(
                &file.patch.target_path,
                &content_from_diff(&file.patch.diff),
                file.entities.iter().cloned(),
                false,
                spec_hash.clone(),
            );
        }
        for (package, task_ids) in &packages {
            if task_ids.iter().all(|id| succeeded.contains(id.as_str())) {
                let paths = plan
                    .tasks()
                    .filter(|(_, t)| task_ids.contains(&t.id))
                    .map(|(_, t)| t.target_path.clone())
                    .collect();
                self.cache.insert(CacheKey::new(&spec_hash, package), paths);
            }
        }

        if error.is_none() {
            report.removed = stale_files(&decision, &plan, guard.state());
            for path in &report.removed {
                guard.state_mut().remove_file(path);
            }
            guard.state_mut().advance_snapshot(&new, spec_hash);
        }

        report.absorb(outcome, self.cache.stats());
        let saved = guard.save().await;

        match (error, saved) {
            (None, Ok(())) => {
                info!(
                    generated = report.patches.len(),
                    skipped = report.skipped.len(),
                    "Run completed"
                );
                Ok(report)
            }
            (None, Err(state_err)) => Err(RunFailure::new(state_err.into(), report)),
            (Some(error), saved) => {
                if let Err(state_err) = saved {
                    warn!(error = %state_err, "Failed to save state after failed run");
                    report.state_error = Some(state_err.to_string());
                }
                warn!(
                    error = %error,
                    generated = report.patches.len(),
                    failed = report.failed.len(),
                    "Run failed"
                );
                Err(RunFailure::new(error, report))
            }
        }
    }
}

/// Affected files no plan task produces any more.
fn stale_files(
    decision: &RegenerationDecision,
    plan: &ExecutionPlan,
    state: &IncrementalState,
) -> Vec<String> {
    let RegenerationMode::Incremental { affected } = &decision.mode else {
        return Vec::new();
    };
    let targets: HashSet<&str> = plan.tasks().map(|(_, t)| t.target_path.as_str()).collect();
    affected
        .iter()
        .filter(|path| !targets.contains(path.as_str()) && state.knows_file(path))
        .cloned()
        .collect()
}
