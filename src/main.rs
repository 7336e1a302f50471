//! # Shrike: PBWT-Based Rare-Variant Phasing
//!
//! Resolves heterozygous and missing genotype calls at rare variants by
//! borrowing statistical support from the phased scaffold haplotypes of a
//! large cohort.
//!
//! ## Usage
//! ```bash
//! shrike --input cohort.vcf.gz --output phased.vcf
//!
//! # With a genetic map and fixed thread count
//! shrike --input cohort.vcf.gz --output phased.vcf --map genetic.map --threads 8
//! ```

use std::time::Instant;

use tracing::info;
use tracing_subscriber::EnvFilter;

use shrike::config::Config;
use shrike::error::Result;
use shrike::pipelines::RarePhasingPipeline;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let start = Instant::now();

    let config = Config::parse_and_validate()?;

    let n_threads = config.nthreads();
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
        .ok();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        threads = n_threads,
        input = ?config.input,
        output = ?config.output,
        "shrike"
    );

    let mut pipeline = RarePhasingPipeline::new(config);
    pipeline.run()?;

    info!(elapsed_secs = start.elapsed().as_secs_f64(), "completed");
    Ok(())
}
