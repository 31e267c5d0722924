//! Configuration System
//!
//! Layered configuration: built-in defaults, the global user file, the
//! workspace file, then `SPECFORGE__SECTION__KEY` environment overrides.
//! Validation reports every violation at once.

use crate::cache::{RegenerationCache, DEFAULT_CAPACITY};
use crate::context::filter::DEFAULT_MAX_DEPTH;
use crate::context::ContextOptions;
use crate::error::AggregateValidationError;
use crate::logging::{LogDestination, LogFormat, LoggingConfig};
use crate::scheduler::SchedulerConfig;
use crate::state::store::DEFAULT_STATE_FILE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ForgeConfig {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub context: ContextSection,

    #[serde(default)]
    pub state: StateSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-task timeout; unset means tasks are bounded only by cancellation.
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
    /// Sort results by target path after each run.
    #[serde(default = "default_true")]
    pub deterministic: bool,
}

fn default_max_concurrency() -> usize {
    SchedulerConfig::DEFAULT_MAX_CONCURRENCY
}

fn default_true() -> bool {
    true
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            task_timeout_secs: None,
            deterministic: true,
        }
    }
}

impl SchedulerSection {
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrency: self.max_concurrency.max(1),
            task_timeout: self.task_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextSection {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_infrastructure_packages")]
    pub infrastructure_packages: Vec<String>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_infrastructure_packages() -> Vec<String> {
    ContextOptions::default().infrastructure_packages
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            infrastructure_packages: default_infrastructure_packages(),
        }
    }
}

impl ContextSection {
    pub fn to_options(&self) -> ContextOptions {
        ContextOptions {
            max_depth: self.max_depth,
            infrastructure_packages: self.infrastructure_packages.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateSection {
    /// State document location, relative to the output directory.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSection {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_ttl_secs() -> u64 {
    3600
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheSection {
    pub fn build<V: Clone>(&self) -> RegenerationCache<V> {
        RegenerationCache::new(self.capacity, Duration::from_secs(self.ttl_secs))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Scheduler(String),
    Context(String),
    State(String),
    Cache(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Scheduler(msg) => write!(f, "scheduler: {}", msg),
            ValidationError::Context(msg) => write!(f, "context: {}", msg),
            ValidationError::State(msg) => write!(f, "state: {}", msg),
            ValidationError::Cache(msg) => write!(f, "cache: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ForgeConfig {
    /// Every violation in the configuration.
    pub fn violations(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.scheduler.max_concurrency == 0 {
            errors.push(ValidationError::Scheduler(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.scheduler.task_timeout_secs == Some(0) {
            errors.push(ValidationError::Scheduler(
                "task_timeout_secs must be positive when set".to_string(),
            ));
        }

        if self.context.max_depth == 0 {
            errors.push(ValidationError::Context(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self
            .context
            .infrastructure_packages
            .iter()
            .any(|p| p.trim().is_empty())
        {
            errors.push(ValidationError::Context(
                "infrastructure_packages cannot contain empty names".to_string(),
            ));
        }

        if self.state.state_file.as_os_str().is_empty() {
            errors.push(ValidationError::State("state_file cannot be empty".to_string()));
        } else if self.state.state_file.is_absolute() {
            errors.push(ValidationError::State(
                "state_file must be relative to the output directory".to_string(),
            ));
        }

        if self.cache.capacity == 0 {
            errors.push(ValidationError::Cache("capacity must be at least 1".to_string()));
        }
        if self.cache.ttl_secs == 0 {
            errors.push(ValidationError::Cache("ttl_secs must be positive".to_string()));
        }

        if let Err(e) = LogFormat::parse(&self.logging.format) {
            errors.push(ValidationError::Logging(e.to_string()));
        }
        if let Err(e) = LogDestination::parse(&self.logging.output) {
            errors.push(ValidationError::Logging(e.to_string()));
        }

        errors
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), AggregateValidationError> {
        AggregateValidationError::check(self.violations().iter().map(|e| e.to_string()).collect())
    }
}
