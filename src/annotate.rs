//! Classification of k-mer positions within a contig.
//!
//! Every k-mer start position of a contig is hashed with the query's sketch
//! parameters. Positions whose hash is part of the contig's own FracMinHash sketch
//! become anchors, and each anchor is flagged according to whether its hash also
//! appears in the query sketch. Positions with invalid k-mers or hashes above the
//! scaled threshold are dropped.

use rustc_hash::FxHashSet;

use crate::frac_min_hash::FracMinHash;
use crate::hashing::{ItemHash, kmer_hashes};
use crate::sketch_params::SketchParams;

/// Set of hashes in the query sketch.
pub type QueryHashSet = FxHashSet<ItemHash>;

/// A k-mer position whose hash belongs to the contig's own sketch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashPositionRecord {
    /// 0-based start of the k-mer within the contig.
    pub position: usize,
    pub in_query: bool,
    pub hash: ItemHash,
}

impl HashPositionRecord {
    pub fn new(position: usize, in_query: bool, hash: ItemHash) -> Self {
        HashPositionRecord {
            position,
            in_query,
            hash,
        }
    }
}

/// Sketch a contig with the given parameters.
pub fn contig_sketch(seq: &[u8], params: &SketchParams) -> FracMinHash {
    let mut sketch = params.create_sketcher();
    sketch.add_sequence(seq);
    sketch
}

/// True if any hash of the contig sketch is in the query.
pub fn shares_hashes(contig_hashes: &FracMinHash, query: &QueryHashSet) -> bool {
    contig_hashes.hashes().iter().any(|hash| query.contains(hash))
}

/// Build the ordered anchor stream of a contig.
///
/// Positions are strictly increasing. The result is empty if the contig has no
/// valid k-mers retained by its sketch.
pub fn hash_positions(
    seq: &[u8],
    contig_hashes: &FracMinHash,
    query: &QueryHashSet,
) -> Vec<HashPositionRecord> {
    let params = contig_hashes.params();

    kmer_hashes(seq, params.k(), params.seed())
        .enumerate()
        .filter_map(|(pos, hash)| {
            let hash = hash.filter(|h| contig_hashes.contains(*h))?;
            Some(HashPositionRecord::new(pos, query.contains(&hash), hash))
        })
        .collect()
}

/// Annotate a contig against the query.
///
/// Returns `None` when the contig's sketch shares no hashes with the query, in which
/// case the contig is irrelevant and no positions are computed.
pub fn annotate_contig(
    seq: &[u8],
    params: &SketchParams,
    query: &QueryHashSet,
) -> Option<Vec<HashPositionRecord>> {
    let contig_hashes = contig_sketch(seq, params);
    if !shares_hashes(&contig_hashes, query) {
        return None;
    }

    Some(hash_positions(seq, &contig_hashes, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::hash_kmer;

    fn query_from(kmers: &[&str]) -> QueryHashSet {
        kmers
            .iter()
            .filter_map(|kmer| hash_kmer(kmer.as_bytes(), 42))
            .collect()
    }

    #[test]
    fn test_no_shared_hashes() {
        let params = SketchParams::new(4, 1, 42);
        let query = query_from(&["GGGG"]);
        assert_eq!(annotate_contig(b"AAAAAAAA", &params, &query), None);
    }

    #[test]
    fn test_all_positions_at_scaled_one() {
        // every valid k-mer is retained at scaled = 1
        let params = SketchParams::new(4, 1, 42);
        let query = query_from(&["CGTA"]);

        let records = annotate_contig(b"ACGTACGT", &params, &query).unwrap();
        let positions: Vec<usize> = records.iter().map(|r| r.position).collect();
        let flags: Vec<bool> = records.iter().map(|r| r.in_query).collect();

        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
        // CGTA at 1 and its reverse complement TACG at 3
        assert_eq!(flags, vec![false, true, false, true, false]);
        assert_eq!(records[1].hash, hash_kmer(b"CGTA", 42).unwrap());
    }

    #[test]
    fn test_invalid_kmers_dropped() {
        let params = SketchParams::new(4, 1, 42);
        let query = query_from(&["AAAA"]);

        let records = annotate_contig(b"AAAANCCCC", &params, &query).unwrap();
        let positions: Vec<usize> = records.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 5]);
        assert!(records[0].in_query);
        assert!(!records[1].in_query);
    }

    #[test]
    fn test_scaled_filter_drops_positions() {
        // with a scaled factor only hashes at or below max_hash become anchors
        let params = SketchParams::new(5, 4, 42);
        let seq = b"ACGTTGCAAGGCTTACCGATAGGCTTAACG";
        let contig_hashes = contig_sketch(seq, &params);
        let query: QueryHashSet = contig_hashes.hashes().iter().copied().collect();

        let records = hash_positions(seq, &contig_hashes, &query);
        assert!(records.iter().all(|r| r.hash <= params.max_hash()));
        assert!(records.iter().all(|r| r.in_query));
        assert!(records.windows(2).all(|w| w[0].position < w[1].position));
        assert!(records.len() < seq.len() - 5 + 1);
    }
}
