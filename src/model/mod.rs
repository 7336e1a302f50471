//! # Model Module
//!
//! The algorithmic core: incremental PBWT maintenance over scaffold sites,
//! and the neighbor-consensus solvers that resolve rare-site genotypes
//! against the current sort order.

pub mod consensus;
pub mod pbwt;

pub use pbwt::PbwtSweep;
