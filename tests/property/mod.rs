//! Property-based tests for ordering, diffing and bounds

mod change_detection;
mod graph_ordering;
mod invariants;
