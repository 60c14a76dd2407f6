//! Command-line interface definition for the hashannot application.
//!
//! This file defines the `Cli` struct and its subcommands using the `clap` crate:
//! `extract-surrounding` pulls the sequence around query hashes out of a set of contigs,
//! and `sketch` builds a sourmash-compatible DNA signature to use as a query. Custom
//! value parsers validate k-mer length, scaled factor, and thread count. The CLI
//! output is styled using the `anstyle` crate for improved readability.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::hashing::DEFAULT_SEED;
use crate::runs::DEFAULT_MIN_RUN_COUNT;
use crate::sketch_params::Molecule;

const DEFAULT_K: u8 = 31;
const DEFAULT_SCALED: u64 = 1000;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(styles=get_styles())]
#[command(disable_help_subcommand = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct CommonArgs {
    /// Number of threads to use
    #[arg(short, long, global = true, default_value_t = 1, value_parser = validate_threads)]
    pub threads: usize,

    /// Also write log messages to this file
    #[arg(long, global = true, value_parser = clap::value_parser!(PathBuf))]
    pub log_file: Option<PathBuf>,

    /// Report debugging information
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract the contig sequence that could have produced the hashes of a query signature
    #[command(name = "extract-surrounding", alias = "extract_surrounding")]
    ExtractSurrounding(ExtractArgs),

    /// Build a FracMinHash DNA signature from a FASTA file
    Sketch(SketchArgs),
}

#[derive(Args)]
pub struct ExtractArgs {
    /// FASTA file (optionally gzipped) of contigs to extract from
    #[arg(value_parser = clap::value_parser!(PathBuf))]
    pub contigs: PathBuf,

    /// Signature file (JSON, optionally gzipped, or a .sig.zip collection) holding the query sketch
    #[arg(value_parser = clap::value_parser!(PathBuf))]
    pub sigfile: PathBuf,

    /// Write extracted sequence to this FASTA file (gzipped if it ends in .gz)
    #[arg(short = 'o', long, help_heading = "Output", value_parser = clap::value_parser!(PathBuf))]
    pub output_contigs: Option<PathBuf>,

    /// Length of k-mers of the query sketch to select
    #[arg(short, long, help_heading = "Sketch selection", default_value_t = DEFAULT_K, value_parser = validate_kmer_length)]
    pub ksize: u8,

    /// Molecule type of the query sketch to select
    #[arg(long, help_heading = "Sketch selection", value_enum, default_value_t = Molecule::Dna)]
    pub moltype: Molecule,

    /// Minimum number of query hashes in a run for it to be extracted
    #[arg(long, default_value_t = DEFAULT_MIN_RUN_COUNT, value_parser = validate_min_run_count)]
    pub min_run_count: usize,
}

#[derive(Args)]
pub struct SketchArgs {
    /// FASTA file (optionally gzipped) to sketch
    #[arg(value_parser = clap::value_parser!(PathBuf))]
    pub input: PathBuf,

    /// Output signature file (gzipped if it ends in .gz, a zip collection if it ends in .zip)
    #[arg(short = 'o', long, help_heading = "Output", value_parser = clap::value_parser!(PathBuf))]
    pub output: PathBuf,

    /// Name of the signature [default: input file name without extensions]
    #[arg(long, help_heading = "Output")]
    pub name: Option<String>,

    /// Length of k-mers to use
    #[arg(short, long, help_heading = "Sketching parameters", default_value_t = DEFAULT_K, value_parser = validate_kmer_length)]
    pub ksize: u8,

    /// Sketch scaling factor (e.g. 1000 will retain ~0.1% of k-mers)
    #[arg(short, long, help_heading = "Sketching parameters", default_value_t = DEFAULT_SCALED, value_parser = validate_scaled)]
    pub scaled: u64,

    /// Seed for the k-mer hash function
    #[arg(long, help_heading = "Sketching parameters", default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

fn validate_kmer_length(k: &str) -> Result<u8, String> {
    let k: u8 = k
        .parse()
        .map_err(|_| format!("`{k}` isn't a valid k-mer length"))?;

    if k == 0 {
        return Err("k-mer length must be in the range [1, 255]".to_string());
    }

    Ok(k)
}

fn validate_scaled(scaled: &str) -> Result<u64, String> {
    let scaled: u64 = scaled
        .parse()
        .map_err(|_| format!("`{scaled}` isn't a valid scaled factor"))?;

    if scaled == 0 {
        return Err("Scaled factor must be at least 1".to_string());
    }

    Ok(scaled)
}

fn validate_min_run_count(count: &str) -> Result<usize, String> {
    let count: usize = count
        .parse()
        .map_err(|_| format!("`{count}` isn't a valid value"))?;

    if count == 0 {
        return Err("Minimum run count must be at least 1".to_string());
    }

    Ok(count)
}

fn validate_threads(threads: &str) -> Result<usize, String> {
    let threads: usize = threads
        .parse()
        .map_err(|_| format!("`{threads}` isn't a valid value"))?;

    if !(1..=1024).contains(&threads) {
        return Err("Threads  must be in the range [1, 1024]".to_string());
    }

    Ok(threads)
}

fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
        .header(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
        .literal(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .invalid(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .error(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .valid(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .placeholder(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
}
