//! Merge rules: defaults first, later sources override earlier ones.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("scheduler.max_concurrency", 4)?
        .set_default("scheduler.deterministic", true)?
        .set_default("context.max_depth", 5)?
        .set_default("context.infrastructure_packages", vec!["main", "config", "utils"])?
        .set_default("state.state_file", ".specforge/state.json")?
        .set_default("cache.capacity", 128)?
        .set_default("cache.ttl_secs", 3600)
}
