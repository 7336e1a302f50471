//! End-to-end pipeline tests on synthetic cohorts.
//!
//! The scaffold alternates between two marker patterns so the PBWT settles
//! into two haplotype clusters: sites of kind A carry the alternate allele
//! on haplotypes {0, 2}, sites of kind B on haplotypes {1, 3}. Around the
//! mid-scaffold rare site the update order ends B-then-A in both sweep
//! directions, which pins the tail of the sort order to [..., 1, 3, 0, 2]
//! whatever the bootstrap permutation was.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use shrike::config::Config;
use shrike::pipelines::RarePhasingPipeline;

struct SyntheticVcfBuilder {
    sample_ids: Vec<String>,
    lines: Vec<String>,
}

impl SyntheticVcfBuilder {
    fn new(n_samples: usize) -> Self {
        Self {
            sample_ids: (0..n_samples).map(|s| format!("S{}", s + 1)).collect(),
            lines: Vec::new(),
        }
    }

    fn site(&mut self, pos: u32, gts: &[&str]) -> &mut Self {
        assert_eq!(gts.len(), self.sample_ids.len());
        self.lines
            .push(format!("1\t{}\t.\tA\tC\t.\tPASS\t.\tGT\t{}", pos, gts.join("\t")));
        self
    }

    fn build(&self) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".vcf")
            .tempfile()
            .expect("create temp file");

        writeln!(file, "##fileformat=VCFv4.2").unwrap();
        writeln!(file, "##FILTER=<ID=PASS,Description=\"All filters passed\">").unwrap();
        writeln!(
            file,
            "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">"
        )
        .unwrap();
        writeln!(
            file,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{}",
            self.sample_ids.join("\t")
        )
        .unwrap();
        for line in &self.lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }
}

/// Phased scaffold genotypes for one site: kind A puts the alternate allele
/// on the first haplotypes of samples 1 and 2, kind B on their second
/// haplotypes.
fn scaffold_gts(kind_a: bool) -> Vec<&'static str> {
    if kind_a {
        vec!["1|0", "1|0", "0|0", "0|0"]
    } else {
        vec!["0|1", "0|1", "0|0", "0|0"]
    }
}

/// Build the standard 4-sample cohort: 20 scaffold sites with a rare site
/// in the middle, a rare singleton past the scaffold, and one common
/// unphased site at the end.
fn build_cohort() -> NamedTempFile {
    let mut builder = SyntheticVcfBuilder::new(4);
    for s in 0..10u32 {
        let kind_a = s == 9 || (s != 8 && s % 2 == 0);
        builder.site((s + 1) * 100, &scaffold_gts(kind_a));
    }
    // Mid-scaffold rare site: unphased het, pre-phased het carrier,
    // missing call, major-allele homozygote
    builder.site(1050, &["0/1", "1|0", "./.", "0/0"]);
    for s in 10..20u32 {
        let kind_a = s == 10 || (s != 11 && s % 2 == 0);
        builder.site((s + 1) * 100, &scaffold_gts(kind_a));
    }
    // Rare singleton with no carrier support anywhere
    builder.site(2050, &["0/0", "0/0", "0/0", "0/1"]);
    // Too frequent to be rare: carried through unphased
    builder.site(2100, &["0/1", "0/1", "0/1", "0/1"]);
    builder.build()
}

fn run_pipeline(input: PathBuf, output: PathBuf) {
    let config = Config {
        input,
        output,
        map: None,
        rare_maf: 0.45,
        pbwt_maf: 0.01,
        pbwt_modulo: 0.1,
        threads: 0,
        seed: 15052011,
    };
    RarePhasingPipeline::new(config)
        .run()
        .expect("pipeline run");
}

/// Parse an output VCF into (pos -> per-sample GT strings)
fn genotype_table(path: &std::path::Path) -> HashMap<u32, Vec<String>> {
    let contents = std::fs::read_to_string(path).expect("read output");
    let mut table = HashMap::new();
    for line in contents.lines() {
        if line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let pos: u32 = fields[1].parse().unwrap();
        let gts = fields[9..].iter().map(|s| s.to_string()).collect();
        table.insert(pos, gts);
    }
    table
}

#[test]
fn test_rare_sites_phase_onto_scaffold_background() {
    let input = build_cohort();
    let output = NamedTempFile::new().unwrap();
    run_pipeline(input.path().to_path_buf(), output.path().to_path_buf());

    let table = genotype_table(output.path());

    // Scaffold sites come back exactly as loaded
    assert_eq!(table[&100], scaffold_gts(true));
    assert_eq!(table[&200], scaffold_gts(false));

    // The mid-scaffold rare site: the het phases its alternate allele onto
    // the first haplotype, whose scaffold background tracks the pre-phased
    // carrier; the missing call resolves to the unanimous reference
    // neighborhood; the pre-phased carrier is untouched
    let rare = &table[&1050];
    assert_eq!(rare[0], "1|0");
    assert_eq!(rare[1], "1|0");
    assert_eq!(rare[2], "0|0");
    assert_eq!(rare[3], "0|0");

    // The singleton must exit phased with its het alleles intact, in one
    // orientation or the other
    let singleton = &table[&2050];
    assert_eq!(&singleton[..3], &["0|0", "0|0", "0|0"]);
    assert!(
        singleton[3] == "0|1" || singleton[3] == "1|0",
        "singleton got {}",
        singleton[3]
    );

    // The common site is carried through unphased
    assert_eq!(table[&2100], vec!["0/1"; 4]);
}

#[test]
fn test_every_rare_genotype_exits_phased() {
    let input = build_cohort();
    let output = NamedTempFile::new().unwrap();
    run_pipeline(input.path().to_path_buf(), output.path().to_path_buf());

    let table = genotype_table(output.path());
    for (&pos, gts) in &table {
        if pos == 2100 {
            continue;
        }
        for gt in gts {
            assert!(
                gt.contains('|'),
                "unphased genotype {} at position {}",
                gt,
                pos
            );
        }
    }
}

#[test]
fn test_rerun_on_phased_output_is_stable() {
    let input = build_cohort();
    let first = NamedTempFile::new().unwrap();
    run_pipeline(input.path().to_path_buf(), first.path().to_path_buf());

    // Phased rare sites become scaffold on re-read; nothing is left for
    // the solver to change
    let second = NamedTempFile::new().unwrap();
    run_pipeline(first.path().to_path_buf(), second.path().to_path_buf());

    let a = std::fs::read_to_string(first.path()).unwrap();
    let b = std::fs::read_to_string(second.path()).unwrap();
    assert_eq!(a, b);
}
