//! # Genotype Storage Backends
//!
//! Two representations, chosen per variant class:
//!
//! - **Scaffold sites** are dense: every haplotype has a known, phased
//!   allele, stored as one bit per haplotype in a site-major bit matrix.
//! - **Rare sites** are sparse: almost every sample is homozygous for the
//!   major allele, so only the exceptions (minor-allele carriers,
//!   heterozygous calls, missing calls) get a record.
//!
//! Common unphased sites have no solver-facing storage; the I/O layer
//! carries their genotypes through verbatim.

pub mod rare;
pub mod scaffold;

pub use rare::{RareGenotype, RareGenotypeSet};
pub use scaffold::{ScaffoldMatrix, ScaffoldPanel};
