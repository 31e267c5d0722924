//! Integration tests for the specforge orchestration core

mod context_scoping;
mod end_to_end;
mod orchestrator_runs;
mod support;
