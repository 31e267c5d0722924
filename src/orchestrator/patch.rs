//! Generated output as diff text.

use crate::scheduler::TargetPath;
use crate::state::checksum::{content_from_diff, render_new_file_diff};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patch {
    pub target_path: String,
    pub diff: String,
    /// True when the patch creates the file, so reverting means deleting it.
    pub reversible: bool,
}

impl Patch {
    pub fn new_file(target_path: &str, content: &str, reversible: bool) -> Self {
        Self {
            target_path: target_path.to_string(),
            diff: render_new_file_diff(target_path, content),
            reversible,
        }
    }

    pub fn content(&self) -> String {
        content_from_diff(&self.diff)
    }
}

impl TargetPath for Patch {
    fn target_path(&self) -> &str {
        &self.target_path
    }
}
