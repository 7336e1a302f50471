//! # VCF Reading and Writing
//!
//! Parse a VCF into the cohort containers and write the phased result back.
//! Uses the `noodles` crate for header parsing and bgzf decompression;
//! record lines are parsed directly.
//!
//! Classification happens at load time, per site:
//!
//! - every genotype phased (or homozygous) and none missing → **scaffold**,
//!   stored as one bit row per site;
//! - otherwise, minor-allele frequency below the rare threshold → **rare**,
//!   stored as sparse records (only non-major-homozygous samples);
//! - otherwise → **common**, carried through to the output verbatim.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use noodles::bgzf::io as bgzf_io;
use noodles::vcf::Header;
use tracing::{info_span, warn};

use crate::data::haplotype::{SampleIdx, Samples};
use crate::data::storage::rare::{RareGenotype, RareGenotypeSet};
use crate::data::storage::ScaffoldMatrix;
use crate::data::variant::{VariantClass, VariantMap};
use crate::error::{Result, ShrikeError};

/// Missing allele sentinel
pub const MISSING_ALLELE: u8 = 255;

/// Everything loaded from the input VCF, ready for solving
pub struct TargetCohort {
    pub samples: Arc<Samples>,
    pub variants: VariantMap,
    pub scaffold: ScaffoldMatrix,
    pub rare: RareGenotypeSet,
    /// Genotypes of common unphased sites, one (first, second) allele pair
    /// per sample; `MISSING_ALLELE` marks missing calls
    pub common: Vec<Vec<(u8, u8)>>,
}

/// VCF file reader
pub struct VcfReader {
    /// Sample information from the header
    samples: Arc<Samples>,
    /// Multiallelic sites skipped during reading
    n_skipped_multiallelic: usize,
    /// Sites without an alternate allele skipped during reading
    n_skipped_monomorphic: usize,
}

impl VcfReader {
    /// Open a VCF file and read the header
    pub fn open(path: &Path) -> Result<(Self, Box<dyn BufRead + Send>)> {
        info_span!("vcf_open", path = ?path).in_scope(|| {
            let file = File::open(path)?;

            let is_gzipped = path
                .extension()
                .map(|e| e == "gz" || e == "bgz")
                .unwrap_or(false);

            let reader: Box<dyn BufRead + Send> = if is_gzipped {
                Box::new(BufReader::new(bgzf_io::Reader::new(file)))
            } else {
                Box::new(BufReader::new(file))
            };

            Self::from_reader(reader)
        })
    }

    /// Create from a reader
    pub fn from_reader(
        mut reader: Box<dyn BufRead + Send>,
    ) -> Result<(Self, Box<dyn BufRead + Send>)> {
        let mut header_str = String::new();
        loop {
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                break;
            }
            if line.starts_with('#') {
                header_str.push_str(&line);
                if line.starts_with("#CHROM") {
                    break;
                }
            } else {
                break;
            }
        }

        let header: Header = header_str.parse()?;

        let sample_names: Vec<String> = header
            .sample_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let samples = Arc::new(Samples::from_ids(sample_names));

        Ok((
            Self {
                samples,
                n_skipped_multiallelic: 0,
                n_skipped_monomorphic: 0,
            },
            reader,
        ))
    }

    pub fn samples_arc(&self) -> Arc<Samples> {
        self.samples.clone()
    }

    /// Read every record, classifying sites as they stream past
    pub fn read_all(
        &mut self,
        mut reader: Box<dyn BufRead + Send>,
        rare_maf: f64,
    ) -> Result<TargetCohort> {
        info_span!("vcf_read_all").in_scope(|| {
            let n_samples = self.samples.len();
            if n_samples == 0 {
                return Err(ShrikeError::vcf("no samples in VCF header"));
            }

            let mut variants = VariantMap::new();
            let mut scaffold = ScaffoldMatrix::new(n_samples * 2);
            let mut rare = RareGenotypeSet::new(n_samples);
            let mut common: Vec<Vec<(u8, u8)>> = Vec::new();

            let mut gts: Vec<(u8, u8, bool)> = Vec::with_capacity(n_samples);
            let mut line = String::new();
            let mut line_num = 0;
            loop {
                line.clear();
                if reader.read_line(&mut line)? == 0 {
                    break;
                }
                line_num += 1;
                let record = line.trim_end();
                if record.is_empty() || record.starts_with('#') {
                    continue;
                }
                self.parse_record(
                    record,
                    line_num,
                    rare_maf,
                    &mut gts,
                    &mut variants,
                    &mut scaffold,
                    &mut rare,
                    &mut common,
                )?;
            }

            if self.n_skipped_multiallelic > 0 {
                warn!(
                    skipped = self.n_skipped_multiallelic,
                    "multiallelic sites skipped"
                );
            }
            if self.n_skipped_monomorphic > 0 {
                warn!(
                    skipped = self.n_skipped_monomorphic,
                    "monomorphic sites skipped"
                );
            }

            Ok(TargetCohort {
                samples: self.samples.clone(),
                variants,
                scaffold,
                rare,
                common,
            })
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_record(
        &mut self,
        line: &str,
        line_num: usize,
        rare_maf: f64,
        gts: &mut Vec<(u8, u8, bool)>,
        variants: &mut VariantMap,
        scaffold: &mut ScaffoldMatrix,
        rare: &mut RareGenotypeSet,
        common: &mut Vec<Vec<(u8, u8)>>,
    ) -> Result<()> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 10 {
            return Err(ShrikeError::parse(
                line_num,
                format!("expected at least 10 fields, got {}", fields.len()),
            ));
        }

        let chrom = fields[0];
        let pos: u32 = fields[1]
            .parse()
            .map_err(|_| ShrikeError::parse(line_num, "invalid POS field"))?;
        let id: Option<Arc<str>> = if fields[2] == "." {
            None
        } else {
            Some(fields[2].into())
        };
        let ref_allele = fields[3];
        let alt_allele = fields[4];

        if alt_allele.contains(',') {
            self.n_skipped_multiallelic += 1;
            return Ok(());
        }
        if alt_allele == "." {
            self.n_skipped_monomorphic += 1;
            return Ok(());
        }

        let format = fields[8];
        let gt_idx = format
            .split(':')
            .position(|f| f == "GT")
            .ok_or_else(|| ShrikeError::parse(line_num, "no GT field in FORMAT"))?;

        let n_samples = self.samples.len();
        gts.clear();
        let mut scaffold_ok = true;
        let mut alt_count = 0usize;
        let mut known = 0usize;

        for (sample_idx, sample_field) in fields[9..].iter().enumerate() {
            if sample_idx >= n_samples {
                break;
            }
            let gt_field = sample_field.split(':').nth(gt_idx).unwrap_or("./.");
            let (a1, a2, phased) = parse_genotype(gt_field, line_num)?;

            if a1 == MISSING_ALLELE {
                scaffold_ok = false;
            } else {
                if a1 > 1 || a2 > 1 {
                    return Err(ShrikeError::parse(
                        line_num,
                        format!("allele index out of range at biallelic site: {}", gt_field),
                    ));
                }
                alt_count += (a1 + a2) as usize;
                known += 2;
                // Homozygous calls are phase-trivial either way
                if !phased && a1 != a2 {
                    scaffold_ok = false;
                }
            }
            gts.push((a1, a2, phased));
        }

        if gts.len() != n_samples {
            return Err(ShrikeError::parse(
                line_num,
                format!(
                    "expected {} sample columns, got {}",
                    n_samples,
                    gts.len()
                ),
            ));
        }

        if scaffold_ok {
            variants.push_scaffold(chrom, pos, id, ref_allele, alt_allele)?;
            scaffold.push_site(gts.iter().flat_map(|&(a1, a2, _)| [a1 == 1, a2 == 1]));
            return Ok(());
        }

        let af = if known > 0 {
            alt_count as f64 / known as f64
        } else {
            0.0
        };
        let maf = af.min(1.0 - af);

        if maf < rare_maf {
            let major = af > 0.5;
            let vr = variants.push_rare(chrom, pos, id, ref_allele, alt_allele)?;
            let slot = rare.push_variant(major);
            debug_assert_eq!(vr, slot);
            for (s, &(a1, a2, phased)) in gts.iter().enumerate() {
                let sample = SampleIdx::new(s as u32);
                if a1 == MISSING_ALLELE {
                    rare.push_record(slot, RareGenotype::missing(sample));
                } else if a1 != a2 {
                    if phased {
                        // Pre-phased het: kept as-is, the solver passes it
                        // through and uses it as voting context
                        rare.push_record(slot, RareGenotype::phased(sample, a1 == 1, a2 == 1));
                    } else {
                        rare.push_record(slot, RareGenotype::het(sample));
                    }
                } else if (a1 == 1) != major {
                    // Minor-allele homozygote: phase is trivially known
                    rare.push_record(slot, RareGenotype::phased(sample, a1 == 1, a2 == 1));
                }
                // Major-allele homozygotes carry no record
            }
        } else {
            let vc = variants.push_common(chrom, pos, id, ref_allele, alt_allele)?;
            debug_assert_eq!(vc, common.len());
            common.push(gts.iter().map(|&(a1, a2, _)| (a1, a2)).collect());
        }
        Ok(())
    }
}

/// Parse a diploid genotype field (e.g., "0|1", "0/1", ".")
///
/// If one allele is missing, both are treated as missing.
/// Returns (allele1, allele2, is_phased).
fn parse_genotype(gt: &str, line_num: usize) -> Result<(u8, u8, bool)> {
    if gt == "." || gt == "./." || gt == ".|." {
        return Ok((MISSING_ALLELE, MISSING_ALLELE, false));
    }

    let phased = gt.contains('|');
    let sep = if phased { '|' } else { '/' };

    let mut parts = gt.split(sep);
    let a1 = parts.next().map(parse_allele).unwrap_or(MISSING_ALLELE);
    let a2 = match parts.next() {
        Some(part) => parse_allele(part),
        None => {
            return Err(ShrikeError::parse(
                line_num,
                format!("haploid genotype '{}' unsupported", gt),
            ))
        }
    };
    if parts.next().is_some() {
        return Err(ShrikeError::parse(
            line_num,
            format!("genotype '{}' is not diploid", gt),
        ));
    }

    if a1 == MISSING_ALLELE || a2 == MISSING_ALLELE {
        return Ok((MISSING_ALLELE, MISSING_ALLELE, false));
    }
    Ok((a1, a2, phased))
}

/// Parse a single allele string; `.` and unparseable values are missing
#[inline]
fn parse_allele(s: &str) -> u8 {
    if s == "." || s.is_empty() {
        return MISSING_ALLELE;
    }
    s.parse::<u8>().unwrap_or(MISSING_ALLELE)
}

/// VCF file writer
pub struct VcfWriter {
    writer: BufWriter<File>,
}

impl VcfWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn write_header(&mut self, samples: &Samples) -> Result<()> {
        writeln!(self.writer, "##fileformat=VCFv4.2")?;
        writeln!(
            self.writer,
            "##source=shrike v{}",
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(
            self.writer,
            "##FILTER=<ID=PASS,Description=\"All filters passed\">"
        )?;
        writeln!(
            self.writer,
            "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">"
        )?;
        write!(
            self.writer,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT"
        )?;
        for id in samples.ids() {
            write!(self.writer, "\t{}", id)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    /// Write the full variant list in genomic order: scaffold sites as
    /// loaded, rare sites from their resolved records, common sites
    /// verbatim and still unphased.
    pub fn write_all(
        &mut self,
        variants: &VariantMap,
        scaffold: &ScaffoldMatrix,
        rare: &RareGenotypeSet,
        common: &[Vec<(u8, u8)>],
        samples: &Samples,
    ) -> Result<()> {
        let n_samples = samples.len();
        let mut calls: Vec<(u8, u8)> = vec![(0, 0); n_samples];

        for variant in variants.iter() {
            write!(
                self.writer,
                "{}\t{}\t{}\t{}\t{}\t.\tPASS\t.\tGT",
                variants.chrom().unwrap_or("."),
                variant.pos,
                variant.id.as_deref().unwrap_or("."),
                variant.ref_allele,
                variant.alt_allele
            )?;

            match variant.class {
                VariantClass::Scaffold(vs) => {
                    let site = scaffold.site(vs as usize);
                    for s in 0..n_samples {
                        write!(
                            self.writer,
                            "\t{}|{}",
                            site[2 * s] as u8,
                            site[2 * s + 1] as u8
                        )?;
                    }
                }
                VariantClass::Rare(vr) => {
                    let major = rare.major_allele(vr as usize) as u8;
                    calls.iter_mut().for_each(|c| *c = (major, major));
                    for rec in rare.records(vr as usize) {
                        debug_assert!(rec.is_phased(), "unresolved record at write time");
                        let (a0, a1) = rec.alleles();
                        calls[rec.sample().as_usize()] = (a0 as u8, a1 as u8);
                    }
                    for &(a, b) in calls.iter() {
                        write!(self.writer, "\t{}|{}", a, b)?;
                    }
                }
                VariantClass::Common(vc) => {
                    for &(a, b) in common[vc as usize].iter() {
                        if a == MISSING_ALLELE {
                            write!(self.writer, "\t./.")?;
                        } else {
                            write!(self.writer, "\t{}/{}", a, b)?;
                        }
                    }
                }
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for VcfWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
