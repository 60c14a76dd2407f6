//! This module provides the `FracMinHash` struct for computing FracMinHash sketches
//! from DNA sequences. A hash is retained if it falls at or below `max_hash`, which
//! keeps roughly `1/scaled` of all distinct k-mers. Only the set of retained hashes is
//! tracked; abundances are not needed for containment.
//!
//! See Hera et al., 2024: https://www.biorxiv.org/content/10.1101/2023.11.06.565843v3

use std::collections::BTreeSet;

use crate::hashing::{ItemHash, kmer_hashes};
use crate::sketch_params::SketchParams;

pub type Hashes = BTreeSet<ItemHash>;

#[derive(Clone, Debug)]
pub struct FracMinHash {
    hashes: Hashes,
    params: SketchParams,
    max_hash: ItemHash,
    bp_count: u64,
}

impl FracMinHash {
    pub fn new(params: SketchParams) -> Self {
        let max_hash = params.max_hash();
        FracMinHash {
            hashes: BTreeSet::new(),
            params,
            max_hash,
            bp_count: 0,
        }
    }

    /// Build a sketch directly from a set of hashes.
    pub fn from_hashes(params: SketchParams, hashes: impl IntoIterator<Item = ItemHash>) -> Self {
        let mut sketch = FracMinHash::new(params);
        for hash in hashes {
            sketch.add_hash(hash);
        }
        sketch
    }

    /// Add a hash if it passes the scaled threshold.
    pub fn add_hash(&mut self, hash: ItemHash) {
        if self.max_hash == 0 || hash <= self.max_hash {
            self.hashes.insert(hash);
        }
    }

    /// Add all valid k-mers of a sequence. K-mers with ambiguous bases are skipped.
    pub fn add_sequence(&mut self, seq: &[u8]) {
        self.bp_count += seq.len() as u64;

        let max_hash = self.max_hash;
        let retained = kmer_hashes(seq, self.params.k(), self.params.seed())
            .flatten()
            .filter(|&hash| max_hash == 0 || hash <= max_hash);
        self.hashes.extend(retained);
    }

    /// Fold another sketch's hashes into this one.
    pub fn merge(&mut self, other: &FracMinHash) {
        self.hashes.extend(other.hashes.iter().copied());
        self.bp_count += other.bp_count;
    }

    pub fn contains(&self, hash: ItemHash) -> bool {
        self.hashes.contains(&hash)
    }

    /// Fraction of this sketch's hashes that are present in `other`.
    ///
    /// An empty sketch is trivially contained and yields 1.0.
    pub fn contained_by(&self, other: &FracMinHash) -> f64 {
        if self.is_empty() {
            return 1.0;
        }

        let shared = self.hashes.iter().filter(|hash| other.contains(**hash)).count();
        shared as f64 / self.len() as f64
    }

    /// MD5 digest of the sketch in the form used by sourmash signatures.
    pub fn md5sum(&self) -> String {
        let mut ctx = md5::Context::new();
        ctx.consume(self.params.k().to_string());
        for hash in &self.hashes {
            ctx.consume(hash.to_string());
        }
        format!("{:x}", ctx.compute())
    }

    pub fn params(&self) -> &SketchParams {
        &self.params
    }

    pub fn max_hash(&self) -> ItemHash {
        self.max_hash
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn bp_count(&self) -> u64 {
        self.bp_count
    }

    pub fn hashes(&self) -> &Hashes {
        &self.hashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::hash_kmer;

    #[test]
    fn test_scaled_one_keeps_all_kmers() {
        let mut sketch = SketchParams::new(4, 1, 42).create_sketcher();
        sketch.add_sequence(b"ACGTACGT");

        // ACGT, CGTA/TACG, GTAC
        assert_eq!(sketch.len(), 3);
        assert!(sketch.contains(hash_kmer(b"ACGT", 42).unwrap()));
        assert!(sketch.contains(hash_kmer(b"GTAC", 42).unwrap()));
        assert_eq!(sketch.bp_count(), 8);
    }

    #[test]
    fn test_ambiguous_kmers_skipped() {
        let mut sketch = SketchParams::new(4, 1, 42).create_sketcher();
        sketch.add_sequence(b"AAAANCCCC");
        assert_eq!(sketch.len(), 2);
    }

    #[test]
    fn test_max_hash_filter() {
        let params = SketchParams::new(4, 1000, 42);
        let max_hash = params.max_hash();

        let mut sketch = params.create_sketcher();
        sketch.add_hash(max_hash);
        sketch.add_hash(max_hash + 1);
        sketch.add_hash(1);
        assert_eq!(sketch.len(), 2);
        assert!(!sketch.contains(max_hash + 1));
    }

    #[test]
    fn test_containment() {
        let params = SketchParams::new(4, 1, 42);
        let query = FracMinHash::from_hashes(params.clone(), [1, 2, 3, 4]);
        let subset = FracMinHash::from_hashes(params.clone(), [1, 2]);
        let partial = FracMinHash::from_hashes(params.clone(), [3, 4, 5, 6]);
        let disjoint = FracMinHash::from_hashes(params.clone(), [7, 8]);
        let empty = params.create_sketcher();

        assert_eq!(subset.contained_by(&query), 1.0);
        assert_eq!(partial.contained_by(&query), 0.5);
        assert_eq!(disjoint.contained_by(&query), 0.0);
        assert_eq!(empty.contained_by(&query), 1.0);
    }

    #[test]
    fn test_merge() {
        let params = SketchParams::new(4, 1, 42);
        let mut a = FracMinHash::from_hashes(params.clone(), [1, 2]);
        let b = FracMinHash::from_hashes(params, [2, 3]);
        a.merge(&b);
        assert_eq!(a.hashes().iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_md5sum_is_order_independent() {
        let params = SketchParams::new(31, 1, 42);
        let a = FracMinHash::from_hashes(params.clone(), [5, 1, 3]);
        let b = FracMinHash::from_hashes(params, [3, 5, 1]);
        assert_eq!(a.md5sum(), b.md5sum());
        assert_eq!(a.md5sum().len(), 32);
    }
}
