//! Fatal conditions that abort a run.
//!
//! Everything else (I/O, parsing) is reported through `anyhow` with context; these
//! variants mark the conditions that indicate bad input selection or a defect in
//! interval computation and must be surfaced distinctly.

use thiserror::Error;

use crate::sketch_params::Molecule;

#[derive(Error, Debug)]
pub enum HashannotError {
    #[error(
        "Selection error: expected exactly one sketch with k = {ksize} and moltype = {molecule} in '{source_path}', found {found}"
    )]
    Selection {
        source_path: String,
        ksize: u8,
        molecule: Molecule,
        found: usize,
    },

    #[error(
        "Containment violation: extracted sequence is only {containment:.6} contained by the query sketch ({missing} of {total} hashes absent from query)"
    )]
    ContainmentViolation {
        containment: f64,
        missing: usize,
        total: usize,
    },

    #[error("Unsupported molecule type '{0}': only DNA sketches can be used for extraction")]
    UnsupportedMolecule(Molecule),

    #[error("Unsupported sketch: {0}")]
    UnsupportedSketch(String),
}
