//! # Variant Classification and the Ordered Variant Map
//!
//! Every site in the input belongs to exactly one class:
//!
//! - **Scaffold**: fully phased in the input; drives PBWT updates.
//! - **Rare**: unphased, minor allele below the rare-frequency threshold;
//!   resolved by the consensus solver.
//! - **Common**: unphased but too frequent to treat as rare; carried
//!   through untouched.
//!
//! Each class has its own dense index space, assigned in genomic order as
//! variants are pushed, so per-class containers (the scaffold bit matrix,
//! the rare record sets) can be indexed directly. The map validates that
//! positions are non-decreasing and that all sites share one chromosome;
//! ordering never changes after loading.

use std::sync::Arc;

use crate::error::{Result, ShrikeError};

use super::genetic_map::GeneticMap;

/// Which class a variant belongs to, with its index in that class's space
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantClass {
    Scaffold(u32),
    Common(u32),
    Rare(u32),
}

impl VariantClass {
    /// Scaffold-space index, if this is a scaffold site
    pub fn idx_scaffold(self) -> Option<usize> {
        match self {
            Self::Scaffold(i) => Some(i as usize),
            _ => None,
        }
    }

    /// Common-space index, if this is a common unphased site
    pub fn idx_common(self) -> Option<usize> {
        match self {
            Self::Common(i) => Some(i as usize),
            _ => None,
        }
    }

    /// Rare-space index, if this is a rare site
    pub fn idx_rare(self) -> Option<usize> {
        match self {
            Self::Rare(i) => Some(i as usize),
            _ => None,
        }
    }
}

/// One site of the ordered variant list
#[derive(Clone, Debug)]
pub struct Variant {
    /// 1-based genomic position (bp)
    pub pos: u32,
    /// rsID or other identifier, if present
    pub id: Option<Arc<str>>,
    /// Reference allele
    pub ref_allele: Box<str>,
    /// Alternate allele (biallelic sites only)
    pub alt_allele: Box<str>,
    /// Interpolated genetic position (cM); 0 until the map is applied
    pub cm: f64,
    /// Classification with per-class index
    pub class: VariantClass,
}

/// The full variant list, ordered by genomic position
#[derive(Clone, Debug, Default)]
pub struct VariantMap {
    chrom: Option<Arc<str>>,
    variants: Vec<Variant>,
    n_scaffold: u32,
    n_common: u32,
    n_rare: u32,
}

impl VariantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chromosome shared by every site, if any site has been pushed
    pub fn chrom(&self) -> Option<&str> {
        self.chrom.as_deref()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn n_scaffold(&self) -> usize {
        self.n_scaffold as usize
    }

    pub fn n_common(&self) -> usize {
        self.n_common as usize
    }

    pub fn n_rare(&self) -> usize {
        self.n_rare as usize
    }

    pub fn get(&self, idx: usize) -> &Variant {
        &self.variants[idx]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variant> {
        self.variants.iter()
    }

    /// Append a scaffold site; returns its scaffold-space index
    pub fn push_scaffold(
        &mut self,
        chrom: &str,
        pos: u32,
        id: Option<Arc<str>>,
        ref_allele: &str,
        alt_allele: &str,
    ) -> Result<usize> {
        let idx = self.n_scaffold;
        self.n_scaffold += 1;
        self.push(chrom, pos, id, ref_allele, alt_allele, VariantClass::Scaffold(idx))?;
        Ok(idx as usize)
    }

    /// Append a common unphased site; returns its common-space index
    pub fn push_common(
        &mut self,
        chrom: &str,
        pos: u32,
        id: Option<Arc<str>>,
        ref_allele: &str,
        alt_allele: &str,
    ) -> Result<usize> {
        let idx = self.n_common;
        self.n_common += 1;
        self.push(chrom, pos, id, ref_allele, alt_allele, VariantClass::Common(idx))?;
        Ok(idx as usize)
    }

    /// Append a rare site; returns its rare-space index
    pub fn push_rare(
        &mut self,
        chrom: &str,
        pos: u32,
        id: Option<Arc<str>>,
        ref_allele: &str,
        alt_allele: &str,
    ) -> Result<usize> {
        let idx = self.n_rare;
        self.n_rare += 1;
        self.push(chrom, pos, id, ref_allele, alt_allele, VariantClass::Rare(idx))?;
        Ok(idx as usize)
    }

    fn push(
        &mut self,
        chrom: &str,
        pos: u32,
        id: Option<Arc<str>>,
        ref_allele: &str,
        alt_allele: &str,
        class: VariantClass,
    ) -> Result<()> {
        match &self.chrom {
            None => self.chrom = Some(chrom.into()),
            Some(c) => {
                if c.as_ref() != chrom {
                    return Err(ShrikeError::invalid_data(format!(
                        "multiple chromosomes in input ({} and {}); run one chromosome at a time",
                        c, chrom
                    )));
                }
            }
        }

        if let Some(last) = self.variants.last() {
            if pos < last.pos {
                return Err(ShrikeError::invalid_data(format!(
                    "positions out of order: {} after {}",
                    pos, last.pos
                )));
            }
        }

        self.variants.push(Variant {
            pos,
            id,
            ref_allele: ref_allele.into(),
            alt_allele: alt_allele.into(),
            cm: 0.0,
            class,
        });
        Ok(())
    }

    /// Fill every variant's genetic position from a map (or the default
    /// 1 cM/Mb scaling when `map` is `None`).
    pub fn set_genetic_positions(&mut self, map: Option<&GeneticMap>) {
        for v in &mut self.variants {
            v.cm = match map {
                Some(m) => m.gen_pos(v.pos),
                None => v.pos as f64 * GeneticMap::DEFAULT_SCALE_FACTOR,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_indices_are_exclusive() {
        let c = VariantClass::Rare(3);
        assert_eq!(c.idx_rare(), Some(3));
        assert_eq!(c.idx_scaffold(), None);
        assert_eq!(c.idx_common(), None);
    }

    #[test]
    fn test_per_class_index_assignment() {
        let mut map = VariantMap::new();
        assert_eq!(map.push_scaffold("1", 100, None, "A", "C").unwrap(), 0);
        assert_eq!(map.push_rare("1", 150, None, "G", "T").unwrap(), 0);
        assert_eq!(map.push_scaffold("1", 200, None, "A", "G").unwrap(), 1);
        assert_eq!(map.push_rare("1", 250, None, "C", "T").unwrap(), 1);
        assert_eq!(map.push_common("1", 300, None, "T", "A").unwrap(), 0);

        assert_eq!(map.len(), 5);
        assert_eq!(map.n_scaffold(), 2);
        assert_eq!(map.n_rare(), 2);
        assert_eq!(map.n_common(), 1);
        assert_eq!(map.get(2).class, VariantClass::Scaffold(1));
    }

    #[test]
    fn test_rejects_position_disorder() {
        let mut map = VariantMap::new();
        map.push_scaffold("1", 200, None, "A", "C").unwrap();
        assert!(map.push_scaffold("1", 100, None, "A", "C").is_err());
    }

    #[test]
    fn test_rejects_chromosome_mixing() {
        let mut map = VariantMap::new();
        map.push_scaffold("1", 100, None, "A", "C").unwrap();
        assert!(map.push_scaffold("2", 200, None, "A", "C").is_err());
    }

    #[test]
    fn test_default_genetic_positions() {
        let mut map = VariantMap::new();
        map.push_scaffold("1", 1_000_000, None, "A", "C").unwrap();
        map.set_genetic_positions(None);
        assert!((map.get(0).cm - 1.0).abs() < 1e-9);
    }
}
