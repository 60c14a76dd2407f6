//! This module defines the `SketchParams` struct, which encapsulates the parameters
//! required to configure and create FracMinHash sketches: k-mer length, scaled factor,
//! hash seed, and molecule type. The same parameters must be used for the query
//! signature and for every contig sketch so that hash values are comparable.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use clap::ValueEnum;

use crate::frac_min_hash::FracMinHash;
use crate::hashing::{DEFAULT_SEED, ItemHash, max_hash_for_scaled, scaled_for_max_hash};

/// Biological alphabet a sketch was computed over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Molecule {
    Dna,
    Protein,
    Dayhoff,
    Hp,
}

impl fmt::Display for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Molecule::Dna => "dna",
            Molecule::Protein => "protein",
            Molecule::Dayhoff => "dayhoff",
            Molecule::Hp => "hp",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Molecule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dna" => Ok(Molecule::Dna),
            "protein" => Ok(Molecule::Protein),
            "dayhoff" => Ok(Molecule::Dayhoff),
            "hp" => Ok(Molecule::Hp),
            other => bail!("Unknown molecule type '{}'", other),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SketchParams {
    kmer_length: u8,
    scaled: u64,
    max_hash: ItemHash,
    seed: u64,
    molecule: Molecule,
}

impl Default for SketchParams {
    fn default() -> Self {
        SketchParams {
            kmer_length: 31,
            scaled: 1000,
            max_hash: max_hash_for_scaled(1000),
            seed: DEFAULT_SEED,
            molecule: Molecule::Dna,
        }
    }
}

impl SketchParams {
    pub fn new(kmer_length: u8, scaled: u64, seed: u64) -> Self {
        SketchParams {
            kmer_length,
            scaled,
            max_hash: max_hash_for_scaled(scaled),
            seed,
            molecule: Molecule::Dna,
        }
    }

    /// Parameters of a stored sketch, keeping its exact `max_hash`.
    ///
    /// The scaled factor is derived for reporting only; converting it back does not
    /// always give the same `max_hash`.
    pub fn from_max_hash(kmer_length: u8, max_hash: ItemHash, seed: u64) -> Self {
        SketchParams {
            kmer_length,
            scaled: scaled_for_max_hash(max_hash),
            max_hash,
            seed,
            molecule: Molecule::Dna,
        }
    }

    /// Create an empty sketch with these parameters.
    pub fn create_sketcher(&self) -> FracMinHash {
        FracMinHash::new(self.clone())
    }

    pub fn k(&self) -> u8 {
        self.kmer_length
    }

    pub fn scaled(&self) -> u64 {
        self.scaled
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn molecule(&self) -> Molecule {
        self.molecule
    }

    pub fn max_hash(&self) -> ItemHash {
        self.max_hash
    }

    /// Return true if sketch parameters are identical.
    pub fn check_compatibility(&self, other: &SketchParams) -> Result<bool> {
        if self.k() != other.k() {
            bail!(
                "Sketch has k = {}, but other sketch has k = {}",
                self.k(),
                other.k()
            );
        }

        // Downsampling to the larger scaled factor would make sketches comparable,
        // but contig sketches are always built with the query's own parameters.
        if self.max_hash() != other.max_hash() {
            bail!(
                "Sketch has scaled = {} (max_hash = {}), but other sketch has scaled = {} \
                 (max_hash = {})",
                self.scaled(),
                self.max_hash(),
                other.scaled(),
                other.max_hash()
            );
        }

        if self.seed() != other.seed() {
            bail!(
                "Sketch has seed = {}, but other sketch has seed = {}",
                self.seed(),
                other.seed()
            );
        }

        if self.molecule() != other.molecule() {
            bail!(
                "Sketch has molecule = {}, but other sketch has molecule = {}",
                self.molecule(),
                other.molecule()
            );
        }

        Ok(true)
    }
}
