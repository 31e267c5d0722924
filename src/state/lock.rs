//! Advisory lock serializing runs against one output directory.
//!
//! The lock is an exclusive `fd-lock` on a file next to the state document,
//! so it holds across orchestrators, stores and processes alike. The guard
//! borrows its file, so a blocking thread owns both and releases them when
//! the [`DirectoryLock`] is dropped.

use crate::error::StateError;
use fd_lock::RwLock;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;

pub struct DirectoryLock {
    path: PathBuf,
    release: Option<mpsc::Sender<()>>,
}

impl DirectoryLock {
    /// Lock file guarding the state document at `state_path`.
    pub fn lock_path_for(state_path: &Path) -> PathBuf {
        let mut name = state_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        state_path.with_file_name(name)
    }

    /// Wait until the exclusive lock on `path` is held.
    pub async fn acquire(path: PathBuf) -> Result<Self, StateError> {
        let (acquired_tx, acquired_rx) = oneshot::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let lock_path = path.clone();
        tokio::task::spawn_blocking(move || {
            let file = match open_lock_file(&lock_path) {
                Ok(file) => file,
                Err(err) => {
                    let _ = acquired_tx.send(Err(err));
                    return;
                }
            };
            let mut lock = RwLock::new(file);
            let guard = match lock.write() {
                Ok(guard) => guard,
                Err(e) => {
                    let _ = acquired_tx.send(Err(locked(&lock_path, e.to_string())));
                    return;
                }
            };
            if acquired_tx.send(Ok(())).is_err() {
                return;
            }
            // Blocks until the DirectoryLock is dropped.
            let _ = release_rx.recv();
            drop(guard);
        });

        match acquired_rx.await {
            Ok(Ok(())) => {
                debug!(path = ?path, "Acquired state directory lock");
                Ok(Self {
                    path,
                    release: Some(release_tx),
                })
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(locked(&path, "lock holder exited".to_string())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        self.release.take();
        debug!(path = ?self.path, "Released state directory lock");
    }
}

fn open_lock_file(path: &Path) -> Result<fs::File, StateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StateError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| StateError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

fn locked(path: &Path, message: String) -> StateError {
    StateError::Locked {
        path: path.to_path_buf(),
        message,
    }
}
