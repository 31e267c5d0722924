//! CLI output: error mapping from domain errors to the CLI surface.

use crate::error::ApiError;

/// Map domain errors to a string for CLI output. Aggregates list one
/// violation per line.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Validation(aggregate) => {
            let mut out = format!("{} validation error(s):", aggregate.len());
            for message in &aggregate.errors {
                out.push_str("\n  - ");
                out.push_str(message);
            }
            out
        }
        other => other.to_string(),
    }
}
