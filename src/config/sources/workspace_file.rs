//! Workspace config file source: <root>/specforge.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

pub const WORKSPACE_CONFIG_FILE: &str = "specforge.toml";

/// Add the workspace config file to builder when present.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = workspace_root.join(WORKSPACE_CONFIG_FILE);
    if path.exists() {
        return Ok(builder.add_source(File::from(path.as_path()).required(false)));
    }
    Ok(builder)
}
