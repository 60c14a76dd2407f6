//! K-mer hashing compatible with sourmash DNA sketches.
//!
//! Each k-mer is upper-cased, compared against its reverse complement, and the
//! lexicographically smaller of the two is hashed with MurmurHash3 x64_128 using
//! the sketch seed. Only the first 64-bit word of the 128-bit hash is kept.

use murmurhash3::murmurhash3_x64_128;

pub type ItemHash = u64;

/// Default seed used by sourmash.
pub const DEFAULT_SEED: u64 = 42;

const COMPLEMENT: [u8; 256] = {
    let mut table = [0; 256];

    table[b'A' as usize] = b'T';
    table[b'C' as usize] = b'G';
    table[b'G' as usize] = b'C';
    table[b'T' as usize] = b'A';

    table
};

const IS_DNA: [bool; 256] = {
    let mut table = [false; 256];

    table[b'A' as usize] = true;
    table[b'C' as usize] = true;
    table[b'G' as usize] = true;
    table[b'T' as usize] = true;

    table
};

/// Largest hash retained by a FracMinHash sketch with the given scaled factor.
pub fn max_hash_for_scaled(scaled: u64) -> ItemHash {
    match scaled {
        0 => 0,
        1 => ItemHash::MAX,
        _ => (ItemHash::MAX as f64 / scaled as f64) as ItemHash,
    }
}

/// Scaled factor corresponding to a maximum retained hash.
pub fn scaled_for_max_hash(max_hash: ItemHash) -> u64 {
    match max_hash {
        0 => 0,
        _ => (ItemHash::MAX as f64 / max_hash as f64) as u64,
    }
}

/// Hash a single upper-cased k-mer given its reverse complement.
#[inline]
fn hash_canonical(kmer: &[u8], rc_kmer: &[u8], seed: u64) -> ItemHash {
    murmurhash3_x64_128(std::cmp::min(kmer, rc_kmer), seed).0
}

/// Hash a k-mer, returning `None` if it contains a base outside of ACGT.
#[cfg(test)]
pub fn hash_kmer(kmer: &[u8], seed: u64) -> Option<ItemHash> {
    let kmer = kmer.to_ascii_uppercase();
    if !kmer.iter().all(|&b| IS_DNA[b as usize]) {
        return None;
    }

    let rc: Vec<u8> = kmer.iter().rev().map(|&b| COMPLEMENT[b as usize]).collect();
    Some(hash_canonical(&kmer, &rc, seed))
}

/// Per-position k-mer hashes of a sequence.
///
/// Yields exactly one item for every k-mer start position `0..=len - k`; the item is
/// `None` where the k-mer contains an invalid base. Sequences shorter than `k` yield
/// nothing.
pub struct KmerHashes {
    fwd: Vec<u8>,
    rev: Vec<u8>,
    k: usize,
    seed: u64,
    pos: usize,
    next_invalid: Option<usize>,
}

impl KmerHashes {
    fn invalid_from(&self, start: usize) -> Option<usize> {
        self.fwd[start..]
            .iter()
            .position(|&b| !IS_DNA[b as usize])
            .map(|offset| start + offset)
    }
}

impl Iterator for KmerHashes {
    type Item = Option<ItemHash>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.fwd.len();
        if self.k == 0 || self.pos + self.k > len {
            return None;
        }

        let pos = self.pos;
        self.pos += 1;

        // skip ahead to the next invalid base once we are past the last one
        if self.next_invalid.is_some_and(|idx| idx < pos) {
            self.next_invalid = self.invalid_from(pos);
        }

        if self.next_invalid.is_some_and(|idx| idx < pos + self.k) {
            return Some(None);
        }

        let kmer = &self.fwd[pos..pos + self.k];
        let rc_kmer = &self.rev[len - pos - self.k..len - pos];
        Some(Some(hash_canonical(kmer, rc_kmer, self.seed)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.fwd.len() + 1).saturating_sub(self.pos + self.k);
        let remaining = if self.k == 0 { 0 } else { remaining };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for KmerHashes {}

/// Create an iterator over the hash of every k-mer in `seq`.
pub fn kmer_hashes(seq: &[u8], k: u8, seed: u64) -> KmerHashes {
    let fwd = seq.to_ascii_uppercase();
    let rev = fwd.iter().rev().map(|&b| COMPLEMENT[b as usize]).collect();

    let mut iter = KmerHashes {
        fwd,
        rev,
        k: k as usize,
        seed,
        pos: 0,
        next_invalid: None,
    };
    iter.next_invalid = iter.invalid_from(0);
    iter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_kmer() {
        // a k-mer and its reverse complement share a hash
        assert_eq!(hash_kmer(b"ACGGT", 42), hash_kmer(b"ACCGT", 42));
        assert_eq!(hash_kmer(b"AAAA", 42), hash_kmer(b"TTTT", 42));
        assert_ne!(hash_kmer(b"AAAA", 42), hash_kmer(b"CCCC", 42));
    }

    #[test]
    fn test_murmur_of_smaller_strand() {
        // TTTT reverse complements to AAAA, which sorts first
        let expected = murmurhash3_x64_128(b"AAAA", 42).0;
        assert_eq!(hash_kmer(b"TTTT", 42), Some(expected));
    }

    #[test]
    fn test_matches_sourmash_hash_murmur() {
        // value of sourmash `hash_murmur("ACG")` with the default seed
        assert_eq!(hash_kmer(b"ACG", DEFAULT_SEED), Some(1731421407650554201));
        assert_eq!(hash_kmer(b"CGT", DEFAULT_SEED), Some(1731421407650554201));
    }

    #[test]
    fn test_mixed_case_seq() {
        assert_eq!(hash_kmer(b"acgTA", 42), hash_kmer(b"ACGTA", 42));

        let lower: Vec<_> = kmer_hashes(b"acgtacgt", 4, 42).collect();
        let upper: Vec<_> = kmer_hashes(b"ACGTACGT", 4, 42).collect();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_seed_changes_hash() {
        assert_ne!(hash_kmer(b"ACGTA", 42), hash_kmer(b"ACGTA", 43));
    }

    #[test]
    fn test_stream_length() {
        assert_eq!(kmer_hashes(b"ACGTACGT", 4, 42).count(), 5);
        assert_eq!(kmer_hashes(b"ACGTACGT", 4, 42).len(), 5);
        assert_eq!(kmer_hashes(b"ACGTACGT", 8, 42).count(), 1);
        assert_eq!(kmer_hashes(b"ACG", 4, 42).count(), 0);
        assert_eq!(kmer_hashes(b"", 4, 42).count(), 0);
    }

    #[test]
    fn test_stream_matches_single_kmer_hash() {
        let seq = b"GATTACAGATTACACCGT";
        let hashes: Vec<_> = kmer_hashes(seq, 5, 42).collect();
        for (pos, hash) in hashes.iter().enumerate() {
            assert_eq!(*hash, hash_kmer(&seq[pos..pos + 5], 42));
        }
    }

    #[test]
    fn test_ambiguous_bases() {
        // every k-mer overlapping the N is invalid, the position count is preserved
        let hashes: Vec<_> = kmer_hashes(b"ACGTNACGTA", 4, 42).collect();
        assert_eq!(hashes.len(), 7);

        let valid: Vec<bool> = hashes.iter().map(|h| h.is_some()).collect();
        assert_eq!(valid, vec![true, false, false, false, false, true, true]);

        assert_eq!(hashes[0], hash_kmer(b"ACGT", 42));
        assert_eq!(hashes[5], hash_kmer(b"ACGT", 42));
        assert_eq!(hash_kmer(b"ACNT", 42), None);
    }

    #[test]
    fn test_multiple_ambiguous_runs() {
        let hashes: Vec<_> = kmer_hashes(b"NAAAANNCCCCN", 4, 42).collect();
        let valid: Vec<bool> = hashes.iter().map(|h| h.is_some()).collect();
        assert_eq!(
            valid,
            vec![false, true, false, false, false, false, false, true, false]
        );
    }

    #[test]
    fn test_scaled_conversions() {
        assert_eq!(max_hash_for_scaled(0), 0);
        assert_eq!(max_hash_for_scaled(1), u64::MAX);
        assert_eq!(max_hash_for_scaled(1000), 18446744073709552);
        assert_eq!(scaled_for_max_hash(18446744073709552), 1000);
        assert_eq!(scaled_for_max_hash(0), 0);
    }
}
