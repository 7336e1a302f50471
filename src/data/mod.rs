//! # Data Module
//!
//! In-memory representations of the cohort. This is the core "Model" layer.
//!
//! ## Design Philosophy: Data-Oriented Design
//! - **Structure of Arrays (SoA):** Scaffold alleles live in one contiguous
//!   bit matrix; rare-site records live in per-variant vectors.
//! - **Zero-cost newtypes:** `SampleIdx` and `HapIdx` prevent index bugs at
//!   compile time with no runtime overhead.
//! - **Classification as an enum:** `VariantClass` makes "a variant belongs
//!   to exactly one of scaffold/common/rare" unrepresentable to violate.

pub mod genetic_map;
pub mod haplotype;
pub mod storage;
pub mod variant;

// Re-export commonly used types
pub use genetic_map::GeneticMap;
pub use haplotype::{HapIdx, SampleIdx, Samples};
pub use storage::{RareGenotype, RareGenotypeSet, ScaffoldMatrix, ScaffoldPanel};
pub use variant::{Variant, VariantClass, VariantMap};
