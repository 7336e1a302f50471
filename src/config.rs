//! # Configuration Logic
//!
//! CLI argument parsing and validation via `clap` derive.

use std::path::PathBuf;

use clap::Parser;

use crate::error::{Result, ShrikeError};

/// PBWT-based rare-variant phasing for large cohorts
#[derive(Parser, Debug, Clone)]
#[command(name = "shrike", version, about)]
pub struct Config {
    /// Input VCF: phased scaffold sites plus unphased rare sites
    /// (.vcf, .vcf.gz or .vcf.bgz)
    #[arg(long)]
    pub input: PathBuf,

    /// Output VCF path
    #[arg(long)]
    pub output: PathBuf,

    /// PLINK-format genetic map (chrom, bp, rate, cM); defaults to
    /// a uniform 1 cM/Mb when absent
    #[arg(long)]
    pub map: Option<PathBuf>,

    /// Minor-allele frequency below which an unphased site is treated
    /// as rare and resolved by consensus
    #[arg(long, default_value_t = 0.001)]
    pub rare_maf: f64,

    /// Minimum minor-allele frequency for a scaffold site to drive
    /// PBWT updates
    #[arg(long, default_value_t = 0.001)]
    pub pbwt_maf: f64,

    /// Genetic-distance width (cM) of PBWT site-selection groups
    #[arg(long, default_value_t = 0.1)]
    pub pbwt_modulo: f64,

    /// Worker threads (0 = all available cores)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Seed for the bootstrap haplotype permutation
    #[arg(long, default_value_t = 15052011)]
    pub seed: u64,
}

impl Config {
    /// Parse CLI arguments and validate them
    pub fn parse_and_validate() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check argument consistency and input existence
    pub fn validate(&self) -> Result<()> {
        if !self.input.exists() {
            return Err(ShrikeError::FileNotFound {
                path: self.input.clone(),
            });
        }
        if let Some(map) = &self.map {
            if !map.exists() {
                return Err(ShrikeError::FileNotFound { path: map.clone() });
            }
        }
        if !(0.0..=0.5).contains(&self.rare_maf) {
            return Err(ShrikeError::config(format!(
                "rare-maf must be in [0, 0.5], got {}",
                self.rare_maf
            )));
        }
        if !(0.0..=0.5).contains(&self.pbwt_maf) {
            return Err(ShrikeError::config(format!(
                "pbwt-maf must be in [0, 0.5], got {}",
                self.pbwt_maf
            )));
        }
        if self.pbwt_modulo <= 0.0 {
            return Err(ShrikeError::config(format!(
                "pbwt-modulo must be positive, got {}",
                self.pbwt_modulo
            )));
        }
        Ok(())
    }

    /// Resolved worker thread count
    pub fn nthreads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}
