//! This module implements extraction of the sequence surrounding query hashes.
//!
//! It provides functionality to:
//! - Annotate each contig against the query sketch and convert runs of query anchors
//!   into sequence intervals.
//! - Accumulate the extracted fragments in input order, folding their sketches into a
//!   running union.
//! - Verify that the union is fully contained by the query sketch.
//! - Write the fragments as (optionally gzip-compressed) FASTA.
//!
//! Contigs are read lazily and processed in batches; contigs within a batch are
//! processed in parallel and merged back in input order.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use needletail::parse_fastx_file;
use num_format::{Locale, ToFormattedString};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::annotate::{QueryHashSet, annotate_contig};
use crate::errors::HashannotError;
use crate::frac_min_hash::FracMinHash;
use crate::io_utils::create_writer;
use crate::progress::progress_spinner;
use crate::runs::{DEFAULT_MIN_RUN_COUNT, Interval, extract_runs, total_length};
use crate::sketch_params::SketchParams;

/// Options controlling extraction.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Minimum number of query anchors a run needs to be reported.
    pub min_run_count: usize,
    /// Number of contigs read before a batch is processed.
    pub batch_size: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            min_run_count: DEFAULT_MIN_RUN_COUNT,
            batch_size: 64,
        }
    }
}

/// A stretch of contig sequence extracted around query hashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedFragment {
    pub contig_name: String,
    pub seq: Vec<u8>,
}

/// Result of extracting a single contig.
#[derive(Clone, Debug)]
pub struct ContigExtraction {
    pub name: String,
    pub seq_len: usize,
    pub intervals: Vec<Interval>,
    pub fragments: Vec<ExtractedFragment>,
    /// Union of the sketches of every fragment.
    pub sketch: FracMinHash,
}

impl ContigExtraction {
    pub fn extracted_len(&self) -> usize {
        total_length(&self.intervals)
    }

    /// Progress line reported for each contig with relevant sequence.
    pub fn report_line(&self) -> String {
        format!(
            "found intervall: {}, original {}, extracted {}",
            self.name,
            self.seq_len,
            self.extracted_len()
        )
    }
}

/// Extract the sequence surrounding query hashes from one contig.
///
/// Returns `None` if the contig shares no hashes with the query.
pub fn extract_contig(
    name: &str,
    seq: &[u8],
    params: &SketchParams,
    query: &QueryHashSet,
    min_run_count: usize,
) -> Option<ContigExtraction> {
    let records = annotate_contig(seq, params, query)?;
    if records.is_empty() {
        return None;
    }

    let intervals = extract_runs(&records, seq.len(), min_run_count);

    let mut sketch = params.create_sketcher();
    let fragments = intervals
        .iter()
        .map(|interval| {
            let fragment = interval.slice(seq);
            sketch.add_sequence(fragment);
            ExtractedFragment {
                contig_name: name.to_string(),
                seq: fragment.to_vec(),
            }
        })
        .collect();

    Some(ContigExtraction {
        name: name.to_string(),
        seq_len: seq.len(),
        intervals,
        fragments,
        sketch,
    })
}

/// Fragments accumulated across all contigs.
#[derive(Clone, Debug)]
pub struct Extraction {
    fragments: Vec<ExtractedFragment>,
    sketch: FracMinHash,
    contigs_seen: usize,
    contigs_matched: usize,
    total_bp: u64,
    extracted_bp: u64,
}

impl Extraction {
    pub fn new(params: &SketchParams) -> Self {
        Extraction {
            fragments: Vec::new(),
            sketch: params.create_sketcher(),
            contigs_seen: 0,
            contigs_matched: 0,
            total_bp: 0,
            extracted_bp: 0,
        }
    }

    /// Record a contig that was examined, with its extraction if it had relevant hashes.
    pub fn add(&mut self, seq_len: usize, contig: Option<ContigExtraction>) {
        self.contigs_seen += 1;
        self.total_bp += seq_len as u64;

        if let Some(contig) = contig {
            self.contigs_matched += 1;
            self.extracted_bp += contig.extracted_len() as u64;
            self.sketch.merge(&contig.sketch);
            self.fragments.extend(contig.fragments);
        }
    }

    pub fn fragments(&self) -> &[ExtractedFragment] {
        &self.fragments
    }

    /// Sketch of all extracted fragments, each fragment sketched on its own.
    pub fn sketch(&self) -> &FracMinHash {
        &self.sketch
    }

    pub fn contigs_seen(&self) -> usize {
        self.contigs_seen
    }

    pub fn contigs_matched(&self) -> usize {
        self.contigs_matched
    }

    pub fn total_bp(&self) -> u64 {
        self.total_bp
    }

    pub fn extracted_bp(&self) -> u64 {
        self.extracted_bp
    }

    /// Require every hash of the extracted sequence to be present in the query.
    pub fn verify(&self, query: &FracMinHash) -> Result<()> {
        self.sketch.params().check_compatibility(query.params())?;

        let containment = self.sketch.contained_by(query);
        debug!(
            "Extracted sketch has {} hashes; containment by query = {}",
            self.sketch.len(),
            containment
        );

        if containment < 1.0 {
            let missing = self
                .sketch
                .hashes()
                .iter()
                .filter(|hash| !query.contains(**hash))
                .count();
            return Err(HashannotError::ContainmentViolation {
                containment,
                missing,
                total: self.sketch.len(),
            }
            .into());
        }

        Ok(())
    }

    /// Write fragments as FASTA, naming each `{contig}.{ordinal}` with a global ordinal.
    pub fn write_fasta<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (n, fragment) in self.fragments.iter().enumerate() {
            writeln!(writer, ">{}.{}", fragment.contig_name, n)?;
            writer.write_all(&fragment.seq)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write fragments to a file, gzip-compressed if the name ends in `.gz`.
    pub fn save_fasta(&self, path: &Path) -> Result<()> {
        let mut writer = create_writer(path)?;
        self.write_fasta(&mut writer)
            .context(format!("Failed to write {}", path.display()))?;
        writer
            .finish()
            .context(format!("Failed to write {}", path.display()))
    }
}

/// Process a batch of contigs in parallel, merging results in input order.
fn process_batch<W: Write>(
    batch: &mut Vec<(String, Vec<u8>)>,
    params: &SketchParams,
    query: &QueryHashSet,
    options: &ExtractOptions,
    extraction: &mut Extraction,
    report: &mut W,
) -> Result<()> {
    let results: Vec<(usize, Option<ContigExtraction>)> = batch
        .par_iter()
        .map(|(name, seq)| {
            (
                seq.len(),
                extract_contig(name, seq, params, query, options.min_run_count),
            )
        })
        .collect();
    batch.clear();

    for (seq_len, contig) in results {
        if let Some(contig) = &contig {
            writeln!(report, "{}", contig.report_line())?;
        }
        extraction.add(seq_len, contig);
    }

    Ok(())
}

/// Extract the sequence surrounding the query's hashes from every contig in a FASTA file.
///
/// A progress line is written to `report` for every contig sharing hashes with the
/// query. The returned extraction has not yet been verified.
pub fn extract_surrounding<W: Write>(
    contigs_file: &Path,
    query: &FracMinHash,
    options: &ExtractOptions,
    report: &mut W,
) -> Result<Extraction> {
    let params = query.params();
    let query_hashes: QueryHashSet = query.hashes().iter().copied().collect();
    info!(
        "Query sketch has {} hashes (k = {}, scaled = {}).",
        query_hashes.len().to_formatted_string(&Locale::en),
        params.k(),
        params.scaled()
    );

    let mut fastx_reader = parse_fastx_file(contigs_file)
        .context(format!("Failed to open {}", contigs_file.display()))?;

    let spinner = progress_spinner("contigs");
    let mut extraction = Extraction::new(params);
    let mut batch = Vec::with_capacity(options.batch_size.max(1));
    while let Some(rec) = fastx_reader.next() {
        let record = rec?;
        let name = String::from_utf8_lossy(record.id()).to_string();
        batch.push((name, record.seq().into_owned()));
        spinner.inc(1);

        if batch.len() >= options.batch_size.max(1) {
            spinner.suspend(|| {
                process_batch(
                    &mut batch,
                    params,
                    &query_hashes,
                    options,
                    &mut extraction,
                    &mut *report,
                )
            })?;
        }
    }

    if !batch.is_empty() {
        spinner.suspend(|| {
            process_batch(
                &mut batch,
                params,
                &query_hashes,
                options,
                &mut extraction,
                &mut *report,
            )
        })?;
    }
    spinner.finish_and_clear();

    info!(
        "Extracted {} of {} bp from {} of {} contigs.",
        extraction.extracted_bp().to_formatted_string(&Locale::en),
        extraction.total_bp().to_formatted_string(&Locale::en),
        extraction.contigs_matched().to_formatted_string(&Locale::en),
        extraction.contigs_seen().to_formatted_string(&Locale::en)
    );

    Ok(extraction)
}
