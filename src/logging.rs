//! Structured logging through `tracing`.
//!
//! Level, format and destination come from the `[logging]` config section.
//! Environment overrides: `SPECFORGE_LOG` (full filter), `SPECFORGE_LOG_FORMAT`,
//! `SPECFORGE_LOG_OUTPUT` and `SPECFORGE_LOG_MODULES` (`module=level,...`).

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const ENV_FILTER: &str = "SPECFORGE_LOG";
const ENV_FORMAT: &str = "SPECFORGE_LOG_FORMAT";
const ENV_OUTPUT: &str = "SPECFORGE_LOG_OUTPUT";
const ENV_MODULES: &str = "SPECFORGE_LOG_MODULES";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error or off
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,

    /// `stdout`, `stderr`, `file`, or `both` (stderr plus file)
    #[serde(default = "LoggingConfig::default_output")]
    pub output: String,

    #[serde(default = "LoggingConfig::default_file")]
    pub file: PathBuf,

    /// ANSI colors for text output on a terminal destination.
    #[serde(default = "LoggingConfig::default_color")]
    pub color: bool,

    /// Per-module level overrides, e.g. `specforge::scheduler = "debug"`.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    fn default_format() -> String {
        "text".to_string()
    }

    // Reports go to stdout; logs stay out of their way.
    fn default_output() -> String {
        "stderr".to_string()
    }

    fn default_file() -> PathBuf {
        PathBuf::from(".specforge/specforge.log")
    }

    fn default_color() -> bool {
        true
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: Self::default_format(),
            output: Self::default_output(),
            file: Self::default_file(),
            color: Self::default_color(),
            modules: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ApiError::ConfigError(format!(
                "unknown log format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    Stdout,
    Stderr,
    File,
    /// stderr and the log file
    Both,
}

impl LogDestination {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            "file" => Ok(Self::File),
            "both" => Ok(Self::Both),
            other => Err(ApiError::ConfigError(format!(
                "unknown log output '{}' (expected stdout, stderr, file or both)",
                other
            ))),
        }
    }

    fn writes_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

/// Install the global subscriber. Environment overrides beat the config,
/// which beats the defaults. Fails if a subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ApiError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let filter = resolve_filter(config)?;
    let format = match std::env::var(ENV_FORMAT) {
        Ok(raw) => LogFormat::parse(&raw)?,
        Err(_) => LogFormat::parse(&config.format)?,
    };
    let destination = match std::env::var(ENV_OUTPUT) {
        Ok(raw) => LogDestination::parse(&raw)?,
        Err(_) => LogDestination::parse(&config.output)?,
    };
    let ansi = config.color && !destination.writes_file();
    let writer = make_writer(destination, &config.file)?;

    let registry = Registry::default().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };
    installed.map_err(|e| ApiError::ConfigError(format!("logging already initialized: {}", e)))
}

fn make_writer(destination: LogDestination, path: &Path) -> Result<BoxMakeWriter, ApiError> {
    Ok(match destination {
        LogDestination::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogDestination::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogDestination::File => BoxMakeWriter::new(open_log_file(path)?),
        LogDestination::Both => BoxMakeWriter::new(std::io::stderr.and(open_log_file(path)?)),
    })
}

fn open_log_file(path: &Path) -> Result<Arc<File>, ApiError> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| {
            ApiError::ConfigError(format!("cannot create log directory {:?}: {}", dir, e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(Arc::new)
        .map_err(|e| ApiError::ConfigError(format!("cannot open log file {:?}: {}", path, e)))
}

/// `SPECFORGE_LOG` replaces everything; otherwise the base level plus config
/// module levels plus `SPECFORGE_LOG_MODULES`, later entries winning.
fn resolve_filter(config: &LoggingConfig) -> Result<EnvFilter, ApiError> {
    if let Ok(filter) = EnvFilter::try_from_env(ENV_FILTER) {
        return Ok(filter);
    }
    if config.level.eq_ignore_ascii_case("off") {
        return Ok(EnvFilter::new("off"));
    }

    let from_env = std::env::var(ENV_MODULES).unwrap_or_default();
    let overrides = config
        .modules
        .iter()
        .map(|(m, l)| (m.as_str(), l.as_str()))
        .chain(parse_module_levels(&from_env));

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in overrides {
        filter = filter.add_directive(parse_directive(module, level)?);
    }
    Ok(filter)
}

fn parse_directive(module: &str, level: &str) -> Result<Directive, ApiError> {
    format!("{}={}", module, level)
        .parse()
        .map_err(|e| ApiError::ConfigError(format!("bad log directive {}={}: {}", module, level, e)))
}

/// `a=debug, b=warn` → [("a", "debug"), ("b", "warn")]; malformed entries are skipped.
fn parse_module_levels(spec: &str) -> Vec<(&str, &str)> {
    spec.split(',')
        .filter_map(|entry| {
            let (module, level) = entry.split_once('=')?;
            let (module, level) = (module.trim(), level.trim());
            (!module.is_empty() && !level.is_empty()).then_some((module, level))
        })
        .collect()
}
