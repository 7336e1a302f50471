//! # Positional Burrows-Wheeler Transform (PBWT)
//!
//! Maintains a sort of the haplotype panel by reversed-prefix similarity:
//! after processing sites s0..=s, haplotypes sharing the longest run of
//! matching alleles ending at s are adjacent in the rank array. One update
//! is a stable two-way partition, so the whole sweep costs
//! O(n_haplotypes × n_evaluated_sites).
//!
//! The rank array starts as a seeded random permutation; the first few
//! updates wash the bootstrap order out. Divergence tracking is only
//! maintained by the forward-direction update, because only the forward
//! sweep consumes distance-weighted votes.

use bitvec::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

/// Mutable rank/divergence state for one directional sweep
///
/// Owned by exactly one sweep and discarded when it finishes. Invariants
/// after every update: `rank` is a permutation of haplotype ids, and
/// `rank[inverse[h]] == h` for every haplotype `h`.
pub struct PbwtSweep {
    /// Haplotype occupying each sort position
    rank: Vec<u32>,
    /// Sort position of each haplotype; exact inverse of `rank`
    inverse: Vec<u32>,
    /// Per-position divergence: most recent site where the haplotype at
    /// this position stopped matching its predecessor in sort order
    div: Vec<u32>,
    /// Partition scratch for the alternate-allele bucket
    rank_scratch: Vec<u32>,
    div_scratch: Vec<u32>,
}

impl PbwtSweep {
    /// Create sweep state over `n_haplotypes`, with the rank array
    /// initialized to a random permutation drawn from `rng`
    pub fn new<R: Rng>(n_haplotypes: usize, rng: &mut R) -> Self {
        let mut rank: Vec<u32> = (0..n_haplotypes as u32).collect();
        rank.shuffle(rng);
        let mut sweep = Self {
            rank,
            inverse: vec![0; n_haplotypes],
            div: vec![0; n_haplotypes],
            rank_scratch: vec![0; n_haplotypes],
            div_scratch: vec![0; n_haplotypes],
        };
        sweep.rebuild_inverse();
        sweep
    }

    pub fn n_haplotypes(&self) -> usize {
        self.rank.len()
    }

    /// Rank order: `rank()[k]` is the haplotype at sort position `k`
    pub fn rank(&self) -> &[u32] {
        &self.rank
    }

    /// Inverse rank: `inverse()[h]` is the sort position of haplotype `h`
    pub fn inverse(&self) -> &[u32] {
        &self.inverse
    }

    /// Divergence values aligned with `rank()`
    pub fn divergence(&self) -> &[u32] {
        &self.div
    }

    /// Advance the sort across one site without divergence tracking
    ///
    /// Stable partition: haplotypes carrying the reference allele keep
    /// their relative order ahead of those carrying the alternate allele.
    pub fn update(&mut self, alleles: &BitSlice<u64, Lsb0>) {
        let n = self.rank.len();
        debug_assert_eq!(alleles.len(), n);

        let mut u = 0;
        let mut v = 0;
        for k in 0..n {
            let hap = self.rank[k];
            if !alleles[hap as usize] {
                self.rank[u] = hap;
                u += 1;
            } else {
                self.rank_scratch[v] = hap;
                v += 1;
            }
        }
        self.rank[u..n].copy_from_slice(&self.rank_scratch[..v]);
        self.rebuild_inverse();
    }

    /// Advance the sort across one site, tracking divergence
    ///
    /// While partitioning, a running boundary per bucket carries the most
    /// recent site at which a within-bucket run was broken: it starts at
    /// the current site, absorbs the maximum of the old divergence values
    /// scanned past, and resets to zero each time a haplotype is admitted
    /// to the bucket. The divergence array is re-partitioned alongside the
    /// rank array.
    pub fn update_with_divergence(&mut self, site: u32, alleles: &BitSlice<u64, Lsb0>) {
        let n = self.rank.len();
        debug_assert_eq!(alleles.len(), n);

        let mut u = 0;
        let mut v = 0;
        let mut p = site;
        let mut q = site;
        for k in 0..n {
            let hap = self.rank[k];
            let d = self.div[k];
            if d > p {
                p = d;
            }
            if d > q {
                q = d;
            }
            if !alleles[hap as usize] {
                self.rank[u] = hap;
                self.div[u] = p;
                p = 0;
                u += 1;
            } else {
                self.rank_scratch[v] = hap;
                self.div_scratch[v] = q;
                q = 0;
                v += 1;
            }
        }
        self.rank[u..n].copy_from_slice(&self.rank_scratch[..v]);
        self.div[u..n].copy_from_slice(&self.div_scratch[..v]);
        self.rebuild_inverse();
    }

    fn rebuild_inverse(&mut self) {
        for (k, &hap) in self.rank.iter().enumerate() {
            self.inverse[hap as usize] = k as u32;
        }
    }

    #[cfg(test)]
    pub(crate) fn from_rank(rank: Vec<u32>) -> Self {
        let n = rank.len();
        let mut sweep = Self {
            rank,
            inverse: vec![0; n],
            div: vec![0; n],
            rank_scratch: vec![0; n],
            div_scratch: vec![0; n],
        };
        sweep.rebuild_inverse();
        sweep
    }

    #[cfg(test)]
    pub(crate) fn from_parts(rank: Vec<u32>, div: Vec<u32>) -> Self {
        let mut sweep = Self::from_rank(rank);
        assert_eq!(sweep.div.len(), div.len());
        sweep.div = div;
        sweep
    }
}
