//! Root-contained file storage.
//!
//! The incremental state store relies on two guarantees: a write is atomic,
//! and a read returns exactly what was last atomically written.

use crate::error::StateError;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

pub trait FileStore: Send + Sync {
    fn root(&self) -> &Path;

    /// Contents of `relative`, or `None` when the file does not exist.
    fn read(&self, relative: &Path) -> Result<Option<Vec<u8>>, StateError>;

    /// Replace `relative` atomically: temp file, flush, sync, rename.
    fn write_atomic(&self, relative: &Path, bytes: &[u8]) -> Result<(), StateError>;

    /// Remove `relative`; returns whether anything was removed.
    fn remove(&self, relative: &Path) -> Result<bool, StateError>;
}

#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Join `relative` onto the root. Absolute paths and any `..` component
    /// are rejected, so the result never leaves the root.
    pub fn resolve(&self, relative: &Path) -> Result<PathBuf, StateError> {
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || relative.as_os_str().is_empty() {
            return Err(StateError::OutsideRoot(relative.to_path_buf()));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl FileStore for LocalFileStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, relative: &Path) -> Result<Option<Vec<u8>>, StateError> {
        let path = self.resolve(relative)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn write_atomic(&self, relative: &Path, bytes: &[u8]) -> Result<(), StateError> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        // Unique temp name per writer, in the target directory so the rename stays atomic.
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| io_error(dir, e))?;
        temp.write_all(bytes).map_err(|e| io_error(temp.path(), e))?;
        temp.flush().map_err(|e| io_error(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| io_error(temp.path(), e))?;

        temp.persist(&path)
            .map(|_| ())
            .map_err(|e| io_error(&path, e.error))
    }

    fn remove(&self, relative: &Path) -> Result<bool, StateError> {
        let path = self.resolve(relative)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}
