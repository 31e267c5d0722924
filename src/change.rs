//! Structural change detection between two specification snapshots.

pub mod change_set;
pub mod detector;
pub mod propagation;

pub use change_set::{CategoryChanges, ChangeSet};
pub use detector::detect_changes;
pub use propagation::affected_packages;
