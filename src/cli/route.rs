//! CLI route: one handler per subcommand over library operations.

use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    context_summary_json, format_change_set_text, format_context_text, format_decision_text,
    to_json,
};
use crate::config::{ConfigLoader, ForgeConfig};
use crate::context::ContextFilter;
use crate::error::ApiError;
use crate::generator::{FileStore, LocalFileStore};
use crate::orchestrator::Orchestrator;
use crate::scheduler::GenerationTask;
use crate::spec::Specification;
use crate::state::StateStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct RunContext {
    workspace_root: PathBuf,
    config: ForgeConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref cfg_path) => ConfigLoader::load_from_file(cfg_path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.validate()?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn from_config(workspace_root: PathBuf, config: ForgeConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Diff { old, new, format } => self.handle_diff(old, new, *format),
            Commands::Affected {
                old,
                new,
                output,
                format,
            } => self.handle_affected(old, new, output, *format),
            Commands::Context {
                spec,
                file,
                task_params,
                format,
            } => self.handle_context(spec, file, task_params.as_deref(), *format),
            Commands::Validate { spec } => self.handle_validate(spec),
            Commands::ClearState { output } => self.handle_clear_state(output),
        }
    }

    fn state_store(&self, output: &Path) -> StateStore {
        let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(output));
        StateStore::new(files, self.config.state.state_file.clone())
    }

    fn handle_diff(&self, old: &Path, new: &Path, format: OutputFormat) -> Result<String, ApiError> {
        let old = Specification::from_path(old)?;
        let new = Specification::from_path(new)?;
        let changes = crate::change::detect_changes(Some(&old), &new);
        match format {
            OutputFormat::Text => Ok(format_change_set_text(&changes)),
            OutputFormat::Json => to_json(&changes),
        }
    }

    fn handle_affected(
        &self,
        old: &Path,
        new: &Path,
        output: &Path,
        format: OutputFormat,
    ) -> Result<String, ApiError> {
        let old = Specification::from_path(old)?;
        let new = Specification::from_path(new)?;
        let state = self.state_store(output).load()?;
        let decision = Orchestrator::plan_regeneration(Some(&old), &new, &state);
        info!(mode = ?decision.mode, "Computed affected files");
        match format {
            OutputFormat::Text => Ok(format_decision_text(&decision)),
            OutputFormat::Json => to_json(&decision),
        }
    }

    fn handle_context(
        &self,
        spec: &Path,
        file: &str,
        task_params: Option<&str>,
        format: OutputFormat,
    ) -> Result<String, ApiError> {
        let spec = Specification::from_path(spec)?;
        let input = match task_params {
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                ApiError::Specification(format!("Invalid --task-params JSON: {}", e))
            })?,
            None => serde_json::Value::Null,
        };
        let task = GenerationTask::produce_file("cli", file).with_input(input);
        let filter = ContextFilter::new(Arc::new(spec), self.config.context.to_options());
        let context = filter.filter_task(&task);
        match format {
            OutputFormat::Text => Ok(format_context_text(&context)),
            OutputFormat::Json => to_json(&context_summary_json(&context)),
        }
    }

    fn handle_validate(&self, spec: &Path) -> Result<String, ApiError> {
        let spec = Specification::from_path(spec)?;
        spec.validate()?;
        Ok(format!(
            "Specification is valid: {} package(s), {} entit{}, {} API contract(s)",
            spec.architecture.packages.len(),
            spec.data_model.entities.len(),
            if spec.data_model.entities.len() == 1 { "y" } else { "ies" },
            spec.api_contracts.len()
        ))
    }

    fn handle_clear_state(&self, output: &Path) -> Result<String, ApiError> {
        let store = self.state_store(output);
        if store.clear()? {
            Ok(format!("Cleared {}", output.join(store.state_file()).display()))
        } else {
            Ok("No incremental state to clear".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::IncrementalState;
    use tempfile::TempDir;

    const OLD: &str = r#"{
        "version": "1",
        "architecture": {"packages": [{"name": "models", "path": "models"}]},
        "data_model": {"entities": [
            {"name": "User", "package": "models", "attributes": {"id": "string"}},
            {"name": "Product", "package": "models", "attributes": {"sku": "string"}}
        ]}
    }"#;

    const NEW: &str = r#"{
        "version": "1",
        "architecture": {"packages": [{"name": "models", "path": "models"}]},
        "data_model": {"entities": [
            {"name": "User", "package": "models", "attributes": {"id": "string", "email": "string"}}
        ]}
    }"#;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn context(dir: &TempDir) -> RunContext {
        RunContext::from_config(dir.path().to_path_buf(), ForgeConfig::default())
    }

    #[test]
    fn diff_renders_text_and_json() {
        let dir = TempDir::new().unwrap();
        let old = write(&dir, "old.json", OLD);
        let new = write(&dir, "new.json", NEW);
        let ctx = context(&dir);

        let text = ctx
            .execute(&Commands::Diff {
                old: old.clone(),
                new: new.clone(),
                format: OutputFormat::Text,
            })
            .unwrap();
        assert!(text.contains("~ User"));
        assert!(text.contains("- Product"));

        let json = ctx
            .execute(&Commands::Diff {
                old,
                new,
                format: OutputFormat::Json,
            })
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entities"]["deleted"][0], "Product");
    }

    #[test]
    fn affected_uses_recorded_state() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let old = write(&dir, "old.json", OLD);
        let new = write(&dir, "new.json", NEW);
        let ctx = context(&dir);

        let mut state = IncrementalState::new();
        state.record_file("models/user.go", "u", ["User"], false);
        state.record_file("models/product.go", "p", ["Product"], false);
        state.record_file("cmd/main.go", "m", Vec::<String>::new(), true);
        ctx.state_store(out.path()).save(&state).unwrap();

        let text = ctx
            .execute(&Commands::Affected {
                old,
                new,
                output: out.path().to_path_buf(),
                format: OutputFormat::Text,
            })
            .unwrap();
        assert!(text.starts_with("Incremental: 2 file(s) affected"));
        assert!(text.contains("models/product.go"));
        assert!(!text.contains("cmd/main.go"));
    }

    #[test]
    fn validate_reports_every_problem() {
        let dir = TempDir::new().unwrap();
        let spec = write(
            &dir,
            "bad.json",
            r#"{"data_model": {"entities": [{"name": "A"}, {"name": "A"}],
                "relationships": [{"from": "A", "to": "B"}]}}"#,
        );
        let err = context(&dir)
            .execute(&Commands::Validate { spec })
            .unwrap_err();
        match err {
            ApiError::Validation(aggregate) => assert_eq!(aggregate.len(), 2),
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn clear_state_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.state_store(out.path())
            .save(&IncrementalState::new())
            .unwrap();
        let command = Commands::ClearState {
            output: out.path().to_path_buf(),
        };
        assert!(ctx.execute(&command).unwrap().starts_with("Cleared"));
        assert_eq!(ctx.execute(&command).unwrap(), "No incremental state to clear");
    }
}
