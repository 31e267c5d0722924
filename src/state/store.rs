//! Persisted incremental state, one document per output directory.

use crate::error::StateError;
use crate::generator::FileStore;
use crate::state::lock::DirectoryLock;
use crate::state::{IncrementalState, STATE_FORMAT_VERSION};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_STATE_FILE: &str = ".specforge/state.json";

/// Loads and saves the state document through a [`FileStore`].
///
/// Plain `load`/`save` calls do synchronous I/O and are safe to run
/// concurrently. A run that loads, updates and saves must hold
/// [`StateStore::lock_run`] for the whole sequence. That lock lives on disk
/// next to the document, so every store over the same directory shares it.
#[derive(Clone)]
pub struct StateStore {
    files: Arc<dyn FileStore>,
    state_file: PathBuf,
}

impl StateStore {
    pub fn new(files: Arc<dyn FileStore>, state_file: impl Into<PathBuf>) -> Self {
        Self {
            files,
            state_file: state_file.into(),
        }
    }

    pub fn with_default_location(files: Arc<dyn FileStore>) -> Self {
        Self::new(files, DEFAULT_STATE_FILE)
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Load the document. An absent document yields a fresh empty state.
    pub fn load(&self) -> Result<IncrementalState, StateError> {
        let Some(bytes) = self.files.read(&self.state_file)? else {
            info!(path = ?self.state_file, "No incremental state found, starting fresh");
            return Ok(IncrementalState::new());
        };

        let raw: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            StateError::Serialization(format!(
                "Failed to parse state from {:?}: {}",
                self.state_file, e
            ))
        })?;
        let version = raw
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        let found = u32::try_from(version).unwrap_or(u32::MAX);
        if found != STATE_FORMAT_VERSION {
            return Err(StateError::UnsupportedVersion {
                found,
                expected: STATE_FORMAT_VERSION,
            });
        }

        let state: IncrementalState = serde_json::from_value(raw).map_err(|e| {
            StateError::Serialization(format!(
                "Failed to deserialize state from {:?}: {}",
                self.state_file, e
            ))
        })?;
        info!(
            path = ?self.state_file,
            files = state.files.len(),
            "Loaded incremental state"
        );
        Ok(state)
    }

    pub fn save(&self, state: &IncrementalState) -> Result<(), StateError> {
        let mut state = state.clone();
        state.version = STATE_FORMAT_VERSION;
        let bytes = serde_json::to_vec_pretty(&state)
            .map_err(|e| StateError::Serialization(format!("Failed to serialize state: {}", e)))?;
        self.files.write_atomic(&self.state_file, &bytes)?;
        info!(
            path = ?self.state_file,
            files = state.files.len(),
            "Saved incremental state"
        );
        Ok(())
    }

    /// Remove the persisted document. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, StateError> {
        let removed = self.files.remove(&self.state_file)?;
        info!(path = ?self.state_file, removed, "Cleared incremental state");
        Ok(removed)
    }

    /// Serialize a load → update → save sequence across every store over the
    /// same directory. The state is loaded once the lock is held and saved
    /// through the returned guard.
    pub async fn lock_run(&self) -> Result<RunGuard, StateError> {
        let lock_path =
            DirectoryLock::lock_path_for(&self.files.root().join(&self.state_file));
        let lock = DirectoryLock::acquire(lock_path).await?;
        let store = self.clone();
        let state = blocking(move || store.load()).await?;
        Ok(RunGuard {
            _lock: lock,
            store: self.clone(),
            state,
        })
    }
}

/// Run synchronous store I/O off the async worker threads.
async fn blocking<T, F>(work: F) -> Result<T, StateError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StateError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StateError::Background(e.to_string()))?
}

/// Exclusive access to the state for one run. Dropping it releases the lock.
pub struct RunGuard {
    _lock: DirectoryLock,
    store: StateStore,
    state: IncrementalState,
}

impl RunGuard {
    pub fn state(&self) -> &IncrementalState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut IncrementalState {
        &mut self.state
    }

    /// Drop the document on disk and start over with an empty state.
    pub async fn reset(&mut self) -> Result<(), StateError> {
        let store = self.store.clone();
        blocking(move || store.clear()).await?;
        self.state = IncrementalState::new();
        Ok(())
    }

    pub async fn save(&mut self) -> Result<(), StateError> {
        self.state.touch();
        let store = self.store.clone();
        let snapshot = self.state.clone();
        blocking(move || store.save(&snapshot)).await
    }
}
