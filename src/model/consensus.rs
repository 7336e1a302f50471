//! # Neighbor-Consensus Genotype Resolution
//!
//! Resolves heterozygous and missing calls at one rare site by polling each
//! governed haplotype's immediate neighbors in PBWT sort order. A working
//! consensus vector holds every haplotype's current allele estimate as a
//! sign (+1 = alternate, -1 = reference), seeded from the site's major
//! allele and overwritten as records resolve, so later votes in the same
//! scan see earlier decisions.
//!
//! Two solver shapes share the relaxation pass:
//!
//! - [`solve_single_pass`] (backward sweep): relaxation only. A decreasing
//!   confidence threshold admits progressively weaker votes, but nothing is
//!   ever forced; ambiguous records stay pending for the forward sweep.
//! - [`solve_two_pass`] (forward sweep): the same relaxation, then a forced
//!   pass in which every remaining record is assigned by the sign of a
//!   distance-weighted vote. Neighbors whose shared-prefix match is recent
//!   (large divergence) contribute less.

use crate::data::storage::rare::RareGenotype;
use crate::model::pbwt::PbwtSweep;

const THRESHOLD_START: f32 = 2.5;
const THRESHOLD_FLOOR: f32 = 1.0;
const THRESHOLD_STEP: f32 = 1.0;

/// Resolve what can be resolved confidently; leave the rest pending.
///
/// Used by the backward sweep, where no divergence information exists.
pub fn solve_single_pass(sweep: &PbwtSweep, records: &mut [RareGenotype], major_allele: bool) {
    let mut consensus = Consensus::seed(sweep.n_haplotypes(), records, major_allele);
    consensus.relax(sweep, records);
}

/// Resolve every record: relaxation first, then forced distance-weighted
/// assignment of whatever remains.
///
/// `origin` is the most recently evaluated scaffold site; `weights` is the
/// per-index log-distance table and must cover index `origin + 1`.
pub fn solve_two_pass(
    sweep: &PbwtSweep,
    records: &mut [RareGenotype],
    major_allele: bool,
    origin: u32,
    weights: &[f32],
) {
    assert!(
        weights.len() > origin as usize + 1,
        "weight table too short: {} entries for origin {}",
        weights.len(),
        origin
    );
    let mut consensus = Consensus::seed(sweep.n_haplotypes(), records, major_allele);
    consensus.relax(sweep, records);
    consensus.force(sweep, records, origin, weights);
}

/// Per-call working state: allele estimates plus the pending record set
struct Consensus {
    /// Sign per haplotype: +1 alternate, -1 reference
    values: Vec<i8>,
    /// Indices into the record slice still awaiting resolution
    pending: Vec<usize>,
    /// Heterozygous records among `pending`
    n_het: usize,
}

impl Consensus {
    fn seed(n_haplotypes: usize, records: &[RareGenotype], major_allele: bool) -> Self {
        let mut values = vec![if major_allele { 1i8 } else { -1i8 }; n_haplotypes];
        let mut pending = Vec::new();
        let mut n_het = 0;

        for (g, rec) in records.iter().enumerate() {
            assert!(
                rec.hap1() < n_haplotypes,
                "record haplotype {} out of panel range {}",
                rec.hap1(),
                n_haplotypes
            );
            if rec.is_phased() {
                let (a0, a1) = rec.alleles();
                values[rec.hap0()] = sign(a0);
                values[rec.hap1()] = sign(a1);
            } else if rec.is_missing() {
                pending.push(g);
            } else if rec.is_het() {
                pending.push(g);
                n_het += 1;
            }
        }

        Self {
            values,
            pending,
            n_het,
        }
    }

    /// Iterate the pending set under a relaxing confidence threshold.
    ///
    /// Heterozygous records resolve when the four-term neighbor vote
    /// clears the threshold; missing records resolve only on unanimous
    /// neighbor agreement for both haplotype slots. The threshold drops by
    /// one step whenever a full scan resolves no additional heterozygote,
    /// and the loop ends once it reaches the floor.
    fn relax(&mut self, sweep: &PbwtSweep, records: &mut [RareGenotype]) {
        let rank = sweep.rank();
        let inverse = sweep.inverse();
        let last = rank.len() - 1;

        let mut thresh = THRESHOLD_START;
        while self.n_het > 0 && thresh > THRESHOLD_FLOOR {
            let het_before = self.n_het;
            let mut n_het = 0;

            let values = &mut self.values;
            self.pending.retain(|&g| {
                let rec = &mut records[g];
                let k0 = inverse[rec.hap0()] as usize;
                let k1 = inverse[rec.hap1()] as usize;

                if rec.is_het() {
                    let mut vote = 0i32;
                    if k0 > 0 {
                        vote += values[rank[k0 - 1] as usize] as i32;
                    }
                    if k0 < last {
                        vote += values[rank[k0 + 1] as usize] as i32;
                    }
                    if k1 > 0 {
                        vote -= values[rank[k1 - 1] as usize] as i32;
                    }
                    if k1 < last {
                        vote -= values[rank[k1 + 1] as usize] as i32;
                    }

                    if vote as f32 > thresh {
                        values[rec.hap0()] = 1;
                        values[rec.hap1()] = -1;
                        rec.set_phase(true, false);
                        false
                    } else if (vote as f32) < -thresh {
                        values[rec.hap0()] = -1;
                        values[rec.hap1()] = 1;
                        rec.set_phase(false, true);
                        false
                    } else {
                        n_het += 1;
                        true
                    }
                } else {
                    let mut v0 = 0i32;
                    let mut v1 = 0i32;
                    if k0 > 0 {
                        v0 += values[rank[k0 - 1] as usize] as i32;
                    }
                    if k0 < last {
                        v0 += values[rank[k0 + 1] as usize] as i32;
                    }
                    if k1 > 0 {
                        v1 += values[rank[k1 - 1] as usize] as i32;
                    }
                    if k1 < last {
                        v1 += values[rank[k1 + 1] as usize] as i32;
                    }

                    // Both slots need unanimous neighbors
                    if v0.abs() == 2 && v1.abs() == 2 {
                        let (a0, a1) = (v0 > 0, v1 > 0);
                        values[rec.hap0()] = sign(a0);
                        values[rec.hap1()] = sign(a1);
                        rec.set_phase(a0, a1);
                        false
                    } else {
                        true
                    }
                }
            });

            if n_het == het_before {
                thresh -= THRESHOLD_STEP;
            }
            self.n_het = n_het;
        }
    }

    /// Assign every remaining record by the sign of its distance-weighted
    /// vote. Each neighbor's contribution is scaled by the log-distance
    /// weight at index `origin - divergence + 1`: a neighbor whose match
    /// with the target began recently gets a small weight.
    ///
    /// A heterozygous vote of exactly zero takes the (0,1) branch; missing
    /// records assign each slot independently, so their alleles may differ.
    fn force(
        &mut self,
        sweep: &PbwtSweep,
        records: &mut [RareGenotype],
        origin: u32,
        weights: &[f32],
    ) {
        let rank = sweep.rank();
        let inverse = sweep.inverse();
        let div = sweep.divergence();
        let last = rank.len() - 1;

        let values = &mut self.values;
        for &g in &self.pending {
            let rec = &mut records[g];
            let k0 = inverse[rec.hap0()] as usize;
            let k1 = inverse[rec.hap1()] as usize;
            debug_assert!(div[k0] <= origin && div[k1] <= origin);

            if rec.is_het() {
                let mut vote = 0.0f32;
                if k0 > 0 {
                    vote += values[rank[k0 - 1] as usize] as f32
                        * weights[(origin - div[k0] + 1) as usize];
                }
                if k0 < last {
                    vote += values[rank[k0 + 1] as usize] as f32
                        * weights[(origin - div[k0 + 1] + 1) as usize];
                }
                if k1 > 0 {
                    vote -= values[rank[k1 - 1] as usize] as f32
                        * weights[(origin - div[k1] + 1) as usize];
                }
                if k1 < last {
                    vote -= values[rank[k1 + 1] as usize] as f32
                        * weights[(origin - div[k1 + 1] + 1) as usize];
                }

                let alt_first = vote > 0.0;
                values[rec.hap0()] = sign(alt_first);
                values[rec.hap1()] = sign(!alt_first);
                rec.set_phase(alt_first, !alt_first);
            } else {
                let mut v0 = 0.0f32;
                let mut v1 = 0.0f32;
                if k0 > 0 {
                    v0 += values[rank[k0 - 1] as usize] as f32
                        * weights[(origin - div[k0] + 1) as usize];
                }
                if k0 < last {
                    v0 += values[rank[k0 + 1] as usize] as f32
                        * weights[(origin - div[k0 + 1] + 1) as usize];
                }
                if k1 > 0 {
                    v1 += values[rank[k1 - 1] as usize] as f32
                        * weights[(origin - div[k1] + 1) as usize];
                }
                if k1 < last {
                    v1 += values[rank[k1 + 1] as usize] as f32
                        * weights[(origin - div[k1 + 1] + 1) as usize];
                }

                let (a0, a1) = (v0 > 0.0, v1 > 0.0);
                values[rec.hap0()] = sign(a0);
                values[rec.hap1()] = sign(a1);
                rec.set_phase(a0, a1);
            }
        }
        self.pending.clear();
        self.n_het = 0;
    }
}

#[inline]
fn sign(alt: bool) -> i8 {
    if alt {
        1
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::haplotype::SampleIdx;

    fn log_weights(n: usize) -> Vec<f32> {
        (0..n).map(|i| ((i + 1) as f32).ln()).collect()
    }

    fn het(sample: u32) -> RareGenotype {
        RareGenotype::het(SampleIdx::new(sample))
    }

    fn missing(sample: u32) -> RareGenotype {
        RareGenotype::missing(SampleIdx::new(sample))
    }

    fn phased(sample: u32, a0: bool, a1: bool) -> RareGenotype {
        RareGenotype::phased(SampleIdx::new(sample), a0, a1)
    }

    #[test]
    fn test_phased_records_pass_through() {
        let sweep = PbwtSweep::from_rank(vec![0, 1, 2, 3]);
        let mut records = vec![phased(0, false, true), phased(1, true, true)];
        let before = records.clone();

        solve_single_pass(&sweep, &mut records, false);
        assert_eq!(records, before);

        solve_two_pass(&sweep, &mut records, false, 0, &log_weights(4));
        assert_eq!(records, before);
    }

    #[test]
    fn test_missing_resolves_on_unanimity() {
        // Sort order puts sample 0's first slot between reference-consensus
        // haplotypes and its second slot between alternate carriers, while
        // sample 1's het sees +3 and resolves in the first scan.
        let sweep = PbwtSweep::from_rank(vec![6, 2, 7, 8, 1, 9, 4, 0, 5, 3]);
        let mut records = vec![
            missing(0),
            het(1),
            phased(3, true, true),
            phased(4, true, true),
        ];

        solve_single_pass(&sweep, &mut records, false);

        assert!(records[0].is_phased());
        assert_eq!(records[0].alleles(), (false, true));
        assert!(records[1].is_phased());
        assert_eq!(records[1].alleles(), (true, false));
    }

    #[test]
    fn test_missing_stays_pending_without_unanimity() {
        // Neighbors of sample 0's second slot disagree (one reference, one
        // alternate), so neither slot pair is unanimous.
        let sweep = PbwtSweep::from_rank(vec![2, 0, 3, 1, 4, 5]);
        let mut records = vec![missing(0), het(2), phased(1, true, true)];

        solve_single_pass(&sweep, &mut records, false);
        assert!(!records[0].is_phased());
    }

    #[test]
    fn test_threshold_relaxes_on_stalled_scan() {
        // The het's vote is exactly +2: below the opening threshold, above
        // the relaxed one, so resolution happens on the second scan.
        let sweep = PbwtSweep::from_rank(vec![0, 1, 2, 3, 4, 5]);
        let mut records = vec![phased(0, true, true), phased(2, false, false), het(1)];

        solve_single_pass(&sweep, &mut records, true);

        assert!(records[2].is_phased());
        assert_eq!(records[2].alleles(), (true, false));
    }

    #[test]
    fn test_weak_votes_never_forced_in_single_pass() {
        // A lone het among major-allele haplotypes: |vote| = 1 at most,
        // under every threshold in the ladder.
        let sweep = PbwtSweep::from_rank(vec![0, 1, 2, 3, 4, 5]);
        let mut records = vec![het(0)];

        solve_single_pass(&sweep, &mut records, true);
        assert!(!records[0].is_phased());
    }

    #[test]
    fn test_tied_vote_stays_pending_then_takes_ref_alt_branch() {
        // Consensus [+1, +1, -1, -1] with sort order [2, 0, 1, 3] makes the
        // het's vote exactly zero: pending through every relaxation step,
        // then forced to (0, 1) by the zero-vote branch of the final pass.
        let rank = vec![2, 0, 1, 3];
        let mut records = vec![phased(1, false, false), het(0)];

        let sweep = PbwtSweep::from_rank(rank.clone());
        solve_single_pass(&sweep, &mut records, true);
        assert!(!records[1].is_phased());

        solve_two_pass(&sweep, &mut records, true, 0, &log_weights(4));
        assert!(records[1].is_phased());
        assert_eq!(records[1].alleles(), (false, true));
    }

    #[test]
    fn test_forced_pass_resolves_everything() {
        let sweep = PbwtSweep::from_rank(vec![0, 1, 2, 3, 4, 5, 6, 7]);
        let mut records = vec![het(0), missing(1), het(2), missing(3)];

        solve_two_pass(&sweep, &mut records, false, 0, &log_weights(4));
        assert!(records.iter().all(|r| r.is_phased()));
    }

    #[test]
    fn test_divergence_weighting_decides_ties() {
        // Same rank order and consensus, different divergence: the side
        // whose match reaches further back carries the larger weight.
        let rank = vec![0, 2, 1, 3, 4, 5];
        let records_init = vec![phased(0, true, true), phased(2, true, true), het(1)];
        let weights = log_weights(8);

        let sweep = PbwtSweep::from_parts(rank.clone(), vec![0, 0, 3, 0, 5, 0]);
        let mut records = records_init.clone();
        solve_two_pass(&sweep, &mut records, true, 5, &weights);
        assert_eq!(records[2].alleles(), (true, false));

        let sweep = PbwtSweep::from_parts(rank, vec![0, 3, 0, 0, 0, 0]);
        let mut records = records_init;
        solve_two_pass(&sweep, &mut records, true, 5, &weights);
        assert_eq!(records[2].alleles(), (false, true));
    }

    #[test]
    fn test_forced_missing_slots_resolve_independently() {
        // Slot votes disagree once weighted: the first slot sees only
        // reference support, the second's alternate neighbor outweighs its
        // discounted reference neighbor.
        let sweep = PbwtSweep::from_parts(vec![0, 1, 2, 3], vec![0, 4, 0, 0]);
        let mut records = vec![missing(0), phased(1, true, true)];

        solve_two_pass(&sweep, &mut records, false, 4, &log_weights(7));
        assert!(records[0].is_phased());
        assert_eq!(records[0].alleles(), (false, true));
    }
}
