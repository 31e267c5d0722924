//! Incremental state: what was generated, from which input, with which checksum.
//!
//! One document per output directory. Collections are always present, so a
//! freshly created or unloaded state iterates as empty.

pub mod affected;
pub mod checksum;
pub mod lock;
pub mod store;

pub use affected::affected_files;
pub use checksum::{content_checksum, content_from_diff, render_new_file_diff, spec_checksum};
pub use lock::DirectoryLock;
pub use store::{RunGuard, StateStore};

use crate::spec::Specification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Bump on any backward-incompatible change to the persisted document.
pub const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileState {
    pub path: String,
    pub checksum: String,
    pub generated_at: DateTime<Utc>,
    /// Entity names the file was generated from.
    #[serde(default)]
    pub entities: BTreeSet<String>,
    /// Rendered from a fixed template rather than the generator.
    #[serde(default)]
    pub template: bool,
    /// Checksum of the snapshot the file was generated from; empty when unknown.
    #[serde(default)]
    pub spec_checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncrementalState {
    pub version: u32,
    #[serde(default)]
    pub spec_checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_spec: Option<Specification>,
    #[serde(default)]
    pub files: BTreeMap<String, FileState>,
    /// File path → entity names.
    #[serde(default)]
    pub dependency_graph: BTreeMap<String, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
}

impl Default for IncrementalState {
    fn default() -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            spec_checksum: String::new(),
            previous_spec: None,
            files: BTreeMap::new(),
            dependency_graph: BTreeMap::new(),
            last_run: None,
        }
    }
}

impl IncrementalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully generated file and the entities it depends on.
    pub fn record_file<I, S>(&mut self, path: &str, content: &str, entities: I, template: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record_generation(path, content, entities, template, String::new());
    }

    /// Like [`record_file`](Self::record_file), also noting the snapshot the
    /// file was generated from so a retry of that snapshot can skip it.
    pub fn record_generation<I, S>(
        &mut self,
        path: &str,
        content: &str,
        entities: I,
        template: bool,
        spec_checksum: String,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entities: BTreeSet<String> = entities.into_iter().map(Into::into).collect();
        self.dependency_graph
            .insert(path.to_string(), entities.clone());
        self.files.insert(
            path.to_string(),
            FileState {
                path: path.to_string(),
                checksum: content_checksum(content),
                generated_at: Utc::now(),
                entities,
                template,
                spec_checksum,
            },
        );
    }

    pub fn remove_file(&mut self, path: &str) -> Option<FileState> {
        self.dependency_graph.remove(path);
        self.files.remove(path)
    }

    pub fn knows_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Whether `path` was already generated from the snapshot with `spec_checksum`.
    pub fn generated_from(&self, path: &str, spec_checksum: &str) -> bool {
        !spec_checksum.is_empty()
            && self
                .files
                .get(path)
                .map(|f| f.spec_checksum == spec_checksum)
                .unwrap_or(false)
    }

    /// Every file path the state has a record or dependency entry for.
    pub fn known_files(&self) -> BTreeSet<String> {
        self.files
            .keys()
            .chain(self.dependency_graph.keys())
            .cloned()
            .collect()
    }

    /// Whether `content` matches the checksum recorded for `path`.
    pub fn is_unchanged(&self, path: &str, content: &str) -> bool {
        self.files
            .get(path)
            .map(|f| f.checksum == content_checksum(content))
            .unwrap_or(false)
    }

    /// Advance the snapshot after a fully successful run.
    pub fn advance_snapshot(&mut self, spec: &Specification, checksum: String) {
        self.spec_checksum = checksum;
        self.previous_spec = Some(spec.clone());
    }

    pub fn touch(&mut self) {
        self.last_run = Some(Utc::now());
    }
}
