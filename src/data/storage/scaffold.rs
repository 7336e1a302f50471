//! # Bit-Packed Scaffold Storage
//!
//! Site-major bit matrix of phased scaffold alleles, one bit per haplotype,
//! plus the per-site flags that gate PBWT maintenance. The matrix is
//! read-only once loaded; the PBWT engine consumes one site row at a time.

use bitvec::prelude::*;

use crate::data::variant::{VariantClass, VariantMap};
use crate::data::HapIdx;

/// Dense phased scaffold alleles, site-major
#[derive(Clone, Debug)]
pub struct ScaffoldMatrix {
    /// One bit per (site, haplotype): 0 = REF, 1 = ALT
    bits: BitVec<u64, Lsb0>,

    /// Number of haplotypes per site (row stride in bits)
    n_haplotypes: usize,

    /// Number of sites stored
    n_sites: usize,
}

impl ScaffoldMatrix {
    /// Create an empty matrix for a panel of `n_haplotypes`
    pub fn new(n_haplotypes: usize) -> Self {
        Self {
            bits: BitVec::new(),
            n_haplotypes,
            n_sites: 0,
        }
    }

    /// Append one site's alleles, in haplotype order
    pub fn push_site(&mut self, alleles: impl Iterator<Item = bool>) {
        let before = self.bits.len();
        self.bits.extend(alleles);
        debug_assert_eq!(self.bits.len() - before, self.n_haplotypes);
        self.n_sites += 1;
    }

    /// One site's alleles as a bit row
    #[inline]
    pub fn site(&self, site: usize) -> &BitSlice<u64, Lsb0> {
        let start = site * self.n_haplotypes;
        &self.bits[start..start + self.n_haplotypes]
    }

    /// Allele of one haplotype at one site
    #[inline]
    pub fn get(&self, site: usize, hap: HapIdx) -> bool {
        self.bits[site * self.n_haplotypes + hap.as_usize()]
    }

    /// ALT-allele count at one site
    pub fn alt_count(&self, site: usize) -> usize {
        self.site(site).count_ones()
    }

    /// Minor-allele frequency at one site
    pub fn maf(&self, site: usize) -> f64 {
        if self.n_haplotypes == 0 {
            return 0.0;
        }
        let af = self.alt_count(site) as f64 / self.n_haplotypes as f64;
        af.min(1.0 - af)
    }

    pub fn n_haplotypes(&self) -> usize {
        self.n_haplotypes
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    /// Memory usage in bytes
    pub fn size_bytes(&self) -> usize {
        self.bits.as_raw_slice().len() * std::mem::size_of::<u64>() + std::mem::size_of::<Self>()
    }
}

/// Scaffold matrix plus the per-site PBWT flags
///
/// `evaluate` gates which scaffold sites advance the PBWT rank/divergence
/// arrays. `select` marks the first evaluated site of each cM-modulo group;
/// it is stored and reported but the sweeps do not branch on it.
#[derive(Clone, Debug)]
pub struct ScaffoldPanel {
    matrix: ScaffoldMatrix,
    evaluate: Vec<bool>,
    select: Vec<bool>,
}

impl ScaffoldPanel {
    /// Wrap a loaded matrix; all sites start unflagged
    pub fn new(matrix: ScaffoldMatrix) -> Self {
        let n = matrix.n_sites();
        Self {
            matrix,
            evaluate: vec![false; n],
            select: vec![false; n],
        }
    }

    pub fn matrix(&self) -> &ScaffoldMatrix {
        &self.matrix
    }

    pub fn n_haplotypes(&self) -> usize {
        self.matrix.n_haplotypes()
    }

    pub fn n_sites(&self) -> usize {
        self.matrix.n_sites()
    }

    /// Does this scaffold site advance the PBWT?
    #[inline]
    pub fn evaluate(&self, site: usize) -> bool {
        self.evaluate[site]
    }

    pub fn n_evaluated(&self) -> usize {
        self.evaluate.iter().filter(|&&e| e).count()
    }

    pub fn n_selected(&self) -> usize {
        self.select.iter().filter(|&&s| s).count()
    }

    /// Flag PBWT sites: `evaluate` for every scaffold site whose MAF is at
    /// least `min_maf`, and `select` for the first evaluated site of each
    /// `modulo_cm`-wide genetic-distance group.
    pub fn flag_pbwt_sites(&mut self, variants: &VariantMap, min_maf: f64, modulo_cm: f64) {
        let mut last_group: Option<i64> = None;
        for variant in variants.iter() {
            let vs = match variant.class {
                VariantClass::Scaffold(vs) => vs as usize,
                _ => continue,
            };
            self.evaluate[vs] = self.matrix.maf(vs) >= min_maf;
            if !self.evaluate[vs] {
                continue;
            }
            let group = (variant.cm / modulo_cm).floor() as i64;
            if last_group != Some(group) {
                self.select[vs] = true;
                last_group = Some(group);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_from_rows(rows: &[&[u8]]) -> ScaffoldMatrix {
        let n_haps = rows[0].len();
        let mut m = ScaffoldMatrix::new(n_haps);
        for row in rows {
            m.push_site(row.iter().map(|&a| a != 0));
        }
        m
    }

    #[test]
    fn test_site_rows_and_lookup() {
        let m = matrix_from_rows(&[&[0, 1, 0, 1], &[1, 1, 0, 0]]);
        assert_eq!(m.n_sites(), 2);
        assert_eq!(m.n_haplotypes(), 4);
        assert!(!m.get(0, HapIdx::new(0)));
        assert!(m.get(0, HapIdx::new(1)));
        assert!(m.get(1, HapIdx::new(0)));
        assert_eq!(m.site(1).count_ones(), 2);
    }

    #[test]
    fn test_maf_folds_to_minor() {
        let m = matrix_from_rows(&[&[1, 1, 1, 0]]);
        assert!((m.maf(0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_flagging_by_maf_and_group() {
        let mut variants = VariantMap::new();
        variants.push_scaffold("1", 100, None, "A", "C").unwrap();
        variants.push_scaffold("1", 200, None, "A", "C").unwrap();
        variants.push_scaffold("1", 300_000, None, "A", "C").unwrap();
        variants.set_genetic_positions(None);

        // Site 1 is a singleton: below the MAF cutoff
        let m = matrix_from_rows(&[&[0, 1, 0, 1], &[1, 0, 0, 0], &[0, 1, 1, 0]]);
        let mut panel = ScaffoldPanel::new(m);
        panel.flag_pbwt_sites(&variants, 0.3, 0.1);

        assert!(panel.evaluate(0));
        assert!(!panel.evaluate(1));
        assert!(panel.evaluate(2));
        assert_eq!(panel.n_evaluated(), 2);
        // Sites 0 and 2 fall in different 0.1 cM groups
        assert_eq!(panel.n_selected(), 2);
    }
}
