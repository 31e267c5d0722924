//! Specforge: Dependency-Aware Incremental Generation
//!
//! Plans, schedules and incrementally regenerates the output files of a
//! specification-driven project. Content comes from an external generator;
//! this crate decides what runs, in which order, with which context, and what
//! can be skipped next time.

pub mod cache;
pub mod change;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod graph;
pub mod logging;
pub mod orchestrator;
pub mod scheduler;
pub mod spec;
pub mod state;
