//! Error types for the specforge generation orchestrator.

use std::path::PathBuf;
use thiserror::Error;

/// Dependency graph validation errors
///
/// Raised before any task runs; nothing is attempted when one of these occurs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node already present: {0}")]
    DuplicateNode(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Cycle detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    #[error("Task {task} depends on unknown id {dependency}")]
    UnresolvedDependency { task: String, dependency: String },
}

/// Errors raised by a single scheduled task
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task {task_id} failed: {message}")]
    Failed { task_id: String, message: String },

    #[error("Task {task_id} dispatched before dependency {dependency} completed")]
    DependencyNotCompleted { task_id: String, dependency: String },

    #[error("Task {task_id} timed out after {timeout_ms}ms")]
    Timeout { task_id: String, timeout_ms: u64 },

    #[error("Task {task_id} panicked: {message}")]
    Panicked { task_id: String, message: String },
}

impl TaskError {
    pub fn task_id(&self) -> &str {
        match self {
            TaskError::Failed { task_id, .. }
            | TaskError::DependencyNotCompleted { task_id, .. }
            | TaskError::Timeout { task_id, .. }
            | TaskError::Panicked { task_id, .. } => task_id,
        }
    }
}

/// Incremental state load/save errors
#[derive(Debug, Error)]
pub enum StateError {
    #[error("State I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported state format version: {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Path escapes the store root: {0:?}")]
    OutsideRoot(PathBuf),

    #[error("Failed to lock state at {path:?}: {message}")]
    Locked { path: PathBuf, message: String },

    #[error("State task did not complete: {0}")]
    Background(String),
}

/// Every failure collected from a batch of independent checks
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{} validation error(s): {}", .errors.len(), .errors.join("; "))]
pub struct AggregateValidationError {
    pub errors: Vec<String>,
}

impl AggregateValidationError {
    /// Ok when nothing was collected, otherwise the aggregate.
    pub fn check(errors: Vec<String>) -> Result<(), AggregateValidationError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateValidationError { errors })
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Top-level error surfaced by the orchestrator and CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Graph validation failed: {0}")]
    Graph(#[from] GraphError),

    #[error("Task execution failed: {0}")]
    Task(#[from] TaskError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Validation failed: {0}")]
    Validation(#[from] AggregateValidationError),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("Specification error: {0}")]
    Specification(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
