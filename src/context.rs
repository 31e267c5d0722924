//! Relevance-scoped context extraction.
//!
//! For one target file, computes the subset of the specification that file
//! depends on: a primary entity set, its transitive references up to a depth
//! bound, the packages those entities live in, and the matching API contracts.

pub mod filter;
pub mod index;

pub use filter::{ContextFilter, ContextOptions, FilteredSpecification};
pub use index::{extract_type_reference, ContextIndex};
