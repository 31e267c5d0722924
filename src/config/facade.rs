//! Config loader facade over the layered sources.

use crate::config::merge::merge_policy;
use crate::config::sources::{env, global_file, workspace_file};
use crate::config::ForgeConfig;
use crate::error::ApiError;
use config::File;
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the layered configuration for `workspace_root`.
    pub fn load(workspace_root: &Path) -> Result<ForgeConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = env::add_to_builder(builder);
        let config: ForgeConfig = builder.build()?.try_deserialize()?;
        debug!(workspace_root = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load defaults plus a single explicit file, then environment overrides.
    pub fn load_from_file(path: &Path) -> Result<ForgeConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?.add_source(File::from(path));
        let builder = env::add_to_builder(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Built-in defaults only.
    pub fn defaults() -> Result<ForgeConfig, ApiError> {
        Ok(merge_policy::builder_with_defaults()?
            .build()?
            .try_deserialize()?)
    }
}
