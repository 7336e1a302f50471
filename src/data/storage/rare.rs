//! # Sparse Rare-Genotype Records
//!
//! Per-rare-variant record sets. A record exists only for samples whose
//! genotype differs from major-allele homozygous: minor-allele homozygotes
//! enter already phased, heterozygous and missing calls enter unresolved.
//! The consensus solver flips each unresolved record to phased exactly once
//! and writes its two alleles in place; records for samples without an
//! entry are implicitly major|major.

use crate::data::haplotype::SampleIdx;

/// One sample's genotype at one rare site
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RareGenotype {
    sample: u32,
    al0: bool,
    al1: bool,
    pha: bool,
    het: bool,
    mis: bool,
}

impl RareGenotype {
    /// A genotype whose phase is already known (homozygous carrier, or
    /// pre-phased by upstream evidence)
    pub fn phased(sample: SampleIdx, al0: bool, al1: bool) -> Self {
        Self {
            sample: sample.0,
            al0,
            al1,
            pha: true,
            het: false,
            mis: false,
        }
    }

    /// An unresolved heterozygous call
    pub fn het(sample: SampleIdx) -> Self {
        Self {
            sample: sample.0,
            al0: false,
            al1: false,
            pha: false,
            het: true,
            mis: false,
        }
    }

    /// An unresolved missing call
    pub fn missing(sample: SampleIdx) -> Self {
        Self {
            sample: sample.0,
            al0: false,
            al1: false,
            pha: false,
            het: false,
            mis: true,
        }
    }

    pub fn sample(&self) -> SampleIdx {
        SampleIdx::new(self.sample)
    }

    /// First haplotype slot governed by this record
    #[inline]
    pub fn hap0(&self) -> usize {
        self.sample as usize * 2
    }

    /// Second haplotype slot governed by this record
    #[inline]
    pub fn hap1(&self) -> usize {
        self.sample as usize * 2 + 1
    }

    #[inline]
    pub fn is_phased(&self) -> bool {
        self.pha
    }

    #[inline]
    pub fn is_het(&self) -> bool {
        self.het
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.mis
    }

    /// The two called alleles; meaningful only once phased
    pub fn alleles(&self) -> (bool, bool) {
        (self.al0, self.al1)
    }

    /// Commit a phase decision. Each record is resolved at most once per
    /// run; re-resolving an already-phased record is a solver bug.
    pub fn set_phase(&mut self, al0: bool, al1: bool) {
        debug_assert!(!self.pha, "record phased twice");
        self.al0 = al0;
        self.al1 = al1;
        self.pha = true;
    }
}

/// All rare-site records, indexed by rare-variant index
#[derive(Clone, Debug, Default)]
pub struct RareGenotypeSet {
    records: Vec<Vec<RareGenotype>>,
    major_alleles: Vec<bool>,
    n_samples: usize,
}

impl RareGenotypeSet {
    pub fn new(n_samples: usize) -> Self {
        Self {
            records: Vec::new(),
            major_alleles: Vec::new(),
            n_samples,
        }
    }

    /// Append a rare variant with its major allele (true = ALT is major);
    /// returns its rare-space index
    pub fn push_variant(&mut self, major_allele: bool) -> usize {
        self.records.push(Vec::new());
        self.major_alleles.push(major_allele);
        self.records.len() - 1
    }

    /// Append one sample's record for rare variant `vr`
    pub fn push_record(&mut self, vr: usize, record: RareGenotype) {
        assert!(
            record.sample().as_usize() < self.n_samples,
            "record sample {} out of range for {} samples",
            record.sample().as_usize(),
            self.n_samples
        );
        self.records[vr].push(record);
    }

    pub fn n_variants(&self) -> usize {
        self.records.len()
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn major_allele(&self, vr: usize) -> bool {
        self.major_alleles[vr]
    }

    pub fn records(&self, vr: usize) -> &[RareGenotype] {
        &self.records[vr]
    }

    pub fn records_mut(&mut self, vr: usize) -> &mut [RareGenotype] {
        &mut self.records[vr]
    }

    /// Mutable access to a contiguous run of rare variants, paired with
    /// their major alleles. Used to hand disjoint per-variant record sets
    /// to parallel consensus calls.
    pub fn variant_range_mut(
        &mut self,
        lo: usize,
        hi: usize,
    ) -> (&mut [Vec<RareGenotype>], &[bool]) {
        (
            &mut self.records[lo..=hi],
            &self.major_alleles[lo..=hi],
        )
    }

    /// Count of records still awaiting a phase decision
    pub fn n_unphased(&self) -> usize {
        self.records
            .iter()
            .flatten()
            .filter(|r| !r.is_phased())
            .count()
    }
}
