//! Conversion of an anchor stream into sequence intervals.
//!
//! A run is a maximal stretch of consecutive anchors whose hashes are in the query.
//! Runs are mapped to closed sequence intervals with asymmetric boundary rules:
//! - a run beginning at the first anchor starts at base 0;
//! - any other run starts one base after the preceding (non-query) anchor;
//! - a run ends one base before the next non-query anchor;
//! - a run still open after the last anchor ends at the last base of the sequence.
//!
//! The resulting intervals never include the k-mer of a non-query anchor, so every
//! k-mer fully inside an interval is either in the query or not retained by the sketch.

use itertools::Itertools;

use crate::annotate::HashPositionRecord;

/// Default minimum number of query anchors for a run to be reported.
pub const DEFAULT_MIN_RUN_COUNT: usize = 1;

/// Closed, 0-based interval `[start, end]` into a contig sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "interval start {start} > end {end}");
        Interval { start, end }
    }

    /// Number of bases covered.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// The covered slice of `seq`.
    pub fn slice<'a>(&self, seq: &'a [u8]) -> &'a [u8] {
        &seq[self.start..=self.end]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    NoRun,
    OpenRun { start: usize, count: usize },
}

struct RunExtractor {
    state: RunState,
    min_run_count: usize,
    intervals: Vec<Interval>,
}

impl RunExtractor {
    fn new(first: &HashPositionRecord, min_run_count: usize) -> Self {
        let state = if first.in_query {
            RunState::OpenRun { start: 0, count: 1 }
        } else {
            RunState::NoRun
        };

        RunExtractor {
            state,
            min_run_count,
            intervals: Vec::new(),
        }
    }

    fn close(&mut self, start: usize, end: usize, count: usize) {
        if count >= self.min_run_count {
            self.intervals.push(Interval::new(start, end));
        }
        self.state = RunState::NoRun;
    }

    fn step(&mut self, prev: &HashPositionRecord, cur: &HashPositionRecord) {
        match (self.state, cur.in_query) {
            (RunState::OpenRun { start, count }, true) => {
                self.state = RunState::OpenRun {
                    start,
                    count: count + 1,
                };
            }
            (RunState::NoRun, true) => {
                self.state = RunState::OpenRun {
                    start: prev.position + 1,
                    count: 1,
                };
            }
            (RunState::OpenRun { start, count }, false) => {
                self.close(start, cur.position - 1, count);
            }
            (RunState::NoRun, false) => {}
        }
    }

    fn finish(mut self, seq_len: usize) -> Vec<Interval> {
        if let RunState::OpenRun { start, count } = self.state {
            self.close(start, seq_len - 1, count);
        }
        self.intervals
    }
}

/// Extract the maximal intervals covered by runs of query anchors.
///
/// `records` must be ordered by strictly increasing position and `seq_len` must be
/// the length of the sequence they were computed from. Intervals are returned in
/// ascending order and never overlap. An empty record list yields no intervals.
pub fn extract_runs(
    records: &[HashPositionRecord],
    seq_len: usize,
    min_run_count: usize,
) -> Vec<Interval> {
    let Some(first) = records.first() else {
        return Vec::new();
    };

    let mut extractor = RunExtractor::new(first, min_run_count);
    for (prev, cur) in records.iter().tuple_windows() {
        extractor.step(prev, cur);
    }

    extractor.finish(seq_len)
}

/// Total number of bases covered by a set of intervals.
pub fn total_length(intervals: &[Interval]) -> usize {
    intervals.iter().map(Interval::len).sum()
}
