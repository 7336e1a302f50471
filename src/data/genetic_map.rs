//! # Genetic Map
//!
//! Physical-to-genetic distance interpolation from PLINK-format map files.
//! Genetic positions feed the cM-modulo grouping of PBWT sites; when no map
//! is supplied, a uniform 1 cM/Mb scaling is used instead.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, ShrikeError};

/// A genetic map for interpolating physical positions to genetic distances (cM)
#[derive(Clone, Debug)]
pub struct GeneticMap {
    /// Physical positions (bp), sorted
    positions: Vec<u32>,

    /// Genetic positions (cM) corresponding to physical positions
    gen_positions: Vec<f64>,
}

impl GeneticMap {
    /// Default scale factor: 1 cM per Mb (1e-6 cM per bp)
    pub const DEFAULT_SCALE_FACTOR: f64 = 1e-6;

    /// Load from PLINK format map file
    ///
    /// Format: chrom position_bp rate_cM_per_Mb position_cM
    /// (the rate column is ignored, only the cumulative position is used)
    pub fn from_plink_file(path: &Path, target_chrom: &str) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut positions = Vec::new();
        let mut gen_positions = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return Err(ShrikeError::parse(
                    line_num + 1,
                    format!("Expected 4 columns, got {}", parts.len()),
                ));
            }

            if parts[0] != target_chrom {
                continue;
            }

            let pos: u32 = parts[1]
                .parse()
                .map_err(|_| ShrikeError::parse(line_num + 1, "Invalid position"))?;

            let gen_pos: f64 = parts[3]
                .parse()
                .map_err(|_| ShrikeError::parse(line_num + 1, "Invalid genetic position"))?;

            if !gen_pos.is_finite() {
                return Err(ShrikeError::parse(
                    line_num + 1,
                    "Genetic position is not finite",
                ));
            }

            positions.push(pos);
            gen_positions.push(gen_pos);
        }

        for i in 1..positions.len() {
            if positions[i] <= positions[i - 1] {
                return Err(ShrikeError::invalid_data(format!(
                    "genetic map positions not in ascending order at position {}",
                    positions[i]
                )));
            }
        }

        Ok(Self {
            positions,
            gen_positions,
        })
    }

    /// Interpolate genetic position (cM) from physical position (bp)
    ///
    /// Positions outside the map's range are extrapolated at the default
    /// 1 cM/Mb rate; only differences between positions matter downstream.
    pub fn gen_pos(&self, phys_pos: u32) -> f64 {
        if self.positions.is_empty() {
            return phys_pos as f64 * Self::DEFAULT_SCALE_FACTOR;
        }

        match self.positions.binary_search(&phys_pos) {
            Ok(idx) => self.gen_positions[idx],
            Err(idx) => {
                if idx == 0 {
                    let delta = (self.positions[0] - phys_pos) as f64;
                    self.gen_positions[0] - delta * Self::DEFAULT_SCALE_FACTOR
                } else if idx == self.positions.len() {
                    let last = self.positions.len() - 1;
                    let delta = (phys_pos - self.positions[last]) as f64;
                    self.gen_positions[last] + delta * Self::DEFAULT_SCALE_FACTOR
                } else {
                    // Linear interpolation between flanking map points
                    let (p0, p1) = (self.positions[idx - 1], self.positions[idx]);
                    let (g0, g1) = (self.gen_positions[idx - 1], self.gen_positions[idx]);
                    let frac = (phys_pos - p0) as f64 / (p1 - p0) as f64;
                    g0 + frac * (g1 - g0)
                }
            }
        }
    }

    /// Number of map points loaded
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
