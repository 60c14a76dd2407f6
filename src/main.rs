
//! Main entry point for the hashannot application.
//!
//! This file handles command-line parsing, logging setup, and dispatch of the
//! `extract-surrounding` and `sketch` commands. Extraction loads a query signature,
//! pulls out the contig sequence surrounding the query's hashes, verifies that the
//! extracted sequence reproduces only query hashes, and optionally writes it as FASTA.

use std::env;
use std::io::{self, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use needletail::parse_fastx_file;

use crate::cli::{Cli, Command, CommonArgs, ExtractArgs, SketchArgs};
use crate::extract::{ExtractOptions, extract_surrounding};
use crate::io_utils::genome_id_from_filename;
use crate::logging::setup_logger;
use crate::progress::progress_spinner;
use crate::signature::{Signature, load_signatures, save_signatures, select_sketch};
use crate::sketch_params::SketchParams;

mod cli;
pub mod annotate;
pub mod errors;
pub mod extract;
pub mod frac_min_hash;
pub mod hashing;
pub mod io_utils;
pub mod logging;
pub mod progress;
pub mod runs;
pub mod signature;
pub mod sketch_params;

/// Common initialization required by all commands.
fn init(common: &CommonArgs) -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    info!("{} v{}", env!("CARGO_PKG_NAME"), VERSION);
    info!("{}", env::args().collect::<Vec<String>>().join(" "));

    info!("Using {} threads.", common.threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(common.threads)
        .build_global()?;

    Ok(())
}

/// Extract sequence surrounding the hashes of a query signature.
fn run_extract(args: &ExtractArgs) -> Result<()> {
    info!("Loading query signature: {}", args.sigfile.display());
    let signatures = load_signatures(&args.sigfile)?;
    let selected = select_sketch(&signatures, args.ksize, args.moltype, &args.sigfile)?;
    info!("Selected query sketch '{}'.", selected.name);

    info!("Extracting from contigs: {}", args.contigs.display());
    let options = ExtractOptions {
        min_run_count: args.min_run_count,
        ..Default::default()
    };

    let stdout = io::stdout();
    let mut report = stdout.lock();
    let extraction = extract_surrounding(&args.contigs, &selected.sketch, &options, &mut report)?;
    report.flush()?;

    // the query may hold hashes absent from these contigs, but never the reverse
    extraction.verify(&selected.sketch)?;
    info!(
        "Verified {} extracted hashes are contained by the query.",
        extraction.sketch().len()
    );

    match &args.output_contigs {
        Some(path) => {
            extraction.save_fasta(path)?;
            info!(
                "Wrote {} sequences to {}",
                extraction.fragments().len(),
                path.display()
            );
        }
        None => {
            writeln!(report, "(no contigs output; use '-o'")?;
        }
    }

    Ok(())
}

/// Build a DNA signature from all records of a FASTA file.
fn run_sketch(args: &SketchArgs) -> Result<()> {
    let params = SketchParams::new(args.ksize, args.scaled, args.seed);
    info!(
        "Sketching {} with k = {}, scaled = {}, seed = {}.",
        args.input.display(),
        params.k(),
        params.scaled(),
        params.seed()
    );

    let mut sketcher = params.create_sketcher();
    let mut fastx_reader = parse_fastx_file(&args.input)
        .context(format!("Failed to open {}", args.input.display()))?;

    let spinner = progress_spinner("records");
    while let Some(rec) = fastx_reader.next() {
        let record = rec?;
        sketcher.add_sequence(&record.seq());
        spinner.inc(1);
    }
    spinner.finish_and_clear();

    let name = args
        .name
        .clone()
        .unwrap_or_else(|| genome_id_from_filename(&args.input));
    let filename = args.input.display().to_string();
    info!(
        "Sketch '{}' has {} hashes from {} bp.",
        name,
        sketcher.len(),
        sketcher.bp_count()
    );

    let signature = Signature::from_sketch(&name, &filename, &sketcher);
    save_signatures(&args.output, &[signature])?;
    info!("Wrote signature to {}", args.output.display());

    Ok(())
}

fn main() -> Result<()> {
    let start = Instant::now();

    let args = Cli::parse();

    setup_logger(args.common.log_file.as_deref(), args.common.verbose)?;

    init(&args.common)?;

    match &args.command {
        Command::ExtractSurrounding(extract_args) => run_extract(extract_args)?,
        Command::Sketch(sketch_args) => run_sketch(sketch_args)?,
    }

    info!("Elapsed time (sec): {:.2}", start.elapsed().as_secs_f32());
    info!("Done.");

    Ok(())
}
