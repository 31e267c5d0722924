//! Task runner bridging the scheduler and the content generator.

use crate::context::ContextFilter;
use crate::error::ApiError;
use crate::generator::Generator;
use crate::orchestrator::patch::Patch;
use crate::scheduler::{CancellationSignal, GenerationTask, TargetPath, TaskRunner};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) struct GeneratedFile {
    pub patch: Patch,
    pub entities: Vec<String>,
    pub degraded: bool,
}

impl TargetPath for GeneratedFile {
    fn target_path(&self) -> &str {
        &self.patch.target_path
    }
}

pub(crate) struct GenerationRunner {
    generator: Arc<dyn Generator>,
    filter: ContextFilter,
    /// Files recorded before this run started.
    known: Arc<HashSet<String>>,
}

impl GenerationRunner {
    pub fn new(
        generator: Arc<dyn Generator>,
        filter: ContextFilter,
        known: Arc<HashSet<String>>,
    ) -> Self {
        Self {
            generator,
            filter,
            known,
        }
    }
}

#[async_trait]
impl TaskRunner<GenerationTask> for GenerationRunner {
    type Output = GeneratedFile;

    async fn run(
        &self,
        task_id: &str,
        task: &GenerationTask,
        cancel: &CancellationSignal,
    ) -> Result<GeneratedFile, ApiError> {
        let context = self.filter.filter_task(task);
        debug!(
            task_id,
            target = %task.target_path,
            entities = context.filtered_entity_count,
            degraded = context.degraded,
            "Generating file"
        );

        let content = tokio::select! {
            generated = self.generator.generate(task, &context, cancel) => generated?,
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
        };

        Ok(GeneratedFile {
            patch: Patch::new_file(
                &task.target_path,
                &content,
                !self.known.contains(&task.target_path),
            ),
            entities: context.entities,
            degraded: context.degraded,
        })
    }
}
