//! # I/O Module
//!
//! VCF reading and writing. The reader classifies sites while loading;
//! the solver core never touches a file.

pub mod vcf;

pub use vcf::{VcfReader, VcfWriter};
