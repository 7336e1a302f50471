//! # Pipelines Module
//!
//! High-level orchestration: wiring configuration, I/O, site selection and
//! the two-sweep solver into a runnable workflow.

pub mod phase_rare;

pub use phase_rare::RarePhasingPipeline;
