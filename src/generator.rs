//! Collaborator contracts consumed by the orchestrator.
//!
//! The content generator is opaque: it turns one task plus its filtered
//! context into file content. It is potentially slow and potentially failing;
//! retry policy belongs to the implementation, never to the scheduler.

pub mod file_store;

pub use file_store::{FileStore, LocalFileStore};

use crate::context::FilteredSpecification;
use crate::error::ApiError;
use crate::scheduler::{CancellationSignal, GenerationTask};
use async_trait::async_trait;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the full content of `task.target_path`.
    ///
    /// Implementations should return `ApiError::Cancelled` promptly once
    /// `cancel` fires.
    async fn generate(
        &self,
        task: &GenerationTask,
        context: &FilteredSpecification,
        cancel: &CancellationSignal,
    ) -> Result<String, ApiError>;
}
