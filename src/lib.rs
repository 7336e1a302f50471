//! # Shrike Library Root
//!
//! ## Role
//! The crate root that declares all public modules and re-exports common types.
//!
//! ## Module Structure
//! ```text
//! shrike
//! ├── data        # In-memory representations (variants, haplotypes, genotypes)
//! │   └── storage # Storage backends (bit-packed scaffold, sparse rare records)
//! ├── io          # File I/O (VCF reading/writing)
//! ├── model       # Algorithms (PBWT maintenance, neighbor consensus)
//! └── pipelines   # High-level orchestration (rare-variant phasing)
//! ```
//!
//! The library walks an ordered variant list twice (backward, then forward),
//! maintaining a positional Burrows-Wheeler sort of the scaffold haplotypes,
//! and resolves heterozygous/missing genotype calls at rare sites by voting
//! among each haplotype's nearest neighbors in sort order.

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod pipelines;
