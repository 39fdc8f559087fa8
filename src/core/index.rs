//! Per-sequence interval index for efficient overlap and proximity queries
//!
//! Uses rust-lapper for O(log n + k) overlap queries, plus start- and
//! end-sorted arrays for O(log n) nearest-neighbour lookups.

use crate::core::{Interval, Strand};
use rust_lapper::{Interval as LapperInterval, Lapper};
use std::collections::HashMap;

/// Lapper node: half-open `[start, end + 1)`, value = row in the store
type IndexInterval = LapperInterval<u64, usize>;

/// Compact copy of the fields the proximity searches need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    /// Row of the interval in its store
    pub row: usize,
}

/// Index over the intervals of one sequence
#[derive(Debug, Clone)]
struct SeqIndex {
    lapper: Lapper<u64, usize>,
    /// Sorted by (start, row)
    by_start: Vec<IndexEntry>,
    /// Sorted by (end, start, row)
    by_end: Vec<IndexEntry>,
}

impl SeqIndex {
    fn new(entries: Vec<IndexEntry>) -> Self {
        let nodes: Vec<IndexInterval> = entries
            .iter()
            .map(|e| LapperInterval {
                start: e.start,
                stop: e.end + 1,
                val: e.row,
            })
            .collect();

        let mut by_start = entries.clone();
        by_start.sort_by_key(|e| (e.start, e.row));
        let mut by_end = entries;
        by_end.sort_by_key(|e| (e.end, e.start, e.row));

        Self {
            lapper: Lapper::new(nodes),
            by_start,
            by_end,
        }
    }
}

/// Interval index organized by sequence name
///
/// Built once per store and never mutated; a store with new coordinates
/// gets a new index.
#[derive(Debug, Clone, Default)]
pub struct StoreIndex {
    maps: HashMap<String, SeqIndex>,
}

impl StoreIndex {
    /// Build the index from the intervals of a store
    pub fn build(intervals: &[Interval]) -> Self {
        let mut entries_by_seq: HashMap<&str, Vec<IndexEntry>> = HashMap::new();

        for (row, iv) in intervals.iter().enumerate() {
            entries_by_seq
                .entry(iv.seqname())
                .or_default()
                .push(IndexEntry {
                    start: iv.start(),
                    end: iv.end(),
                    strand: iv.strand(),
                    row,
                });
        }

        let maps = entries_by_seq
            .into_iter()
            .map(|(seq, entries)| (seq.to_string(), SeqIndex::new(entries)))
            .collect::<HashMap<_, _>>();

        log::debug!(
            "Built interval index: {} intervals on {} sequences",
            intervals.len(),
            maps.len()
        );

        Self { maps }
    }

    /// Rows whose intervals overlap the closed range `[start, end]`,
    /// in ascending row order
    pub fn overlapping(&self, seqname: &str, start: u64, end: u64) -> Vec<usize> {
        match self.maps.get(seqname) {
            Some(idx) => {
                let mut rows: Vec<usize> = idx
                    .lapper
                    .find(start, end.saturating_add(1))
                    .map(|iv| iv.val)
                    .collect();
                rows.sort_unstable();
                rows
            }
            None => vec![],
        }
    }

    /// Closest interval ending strictly before `pos`
    ///
    /// Among intervals sharing the largest end, the one with the smallest
    /// start (then smallest row) wins. Only entries passing `accept` are
    /// considered.
    pub fn nearest_before<F>(&self, seqname: &str, pos: u64, accept: F) -> Option<IndexEntry>
    where
        F: Fn(&IndexEntry) -> bool,
    {
        let idx = self.maps.get(seqname)?;
        let cut = idx.by_end.partition_point(|e| e.end < pos);

        let mut best: Option<IndexEntry> = None;
        for e in idx.by_end[..cut].iter().rev() {
            if let Some(b) = best {
                if e.end != b.end {
                    break;
                }
            }
            if accept(e) {
                best = Some(*e);
            }
        }
        best
    }

    /// Closest interval starting strictly after `pos`, ties broken by row
    pub fn nearest_after<F>(&self, seqname: &str, pos: u64, accept: F) -> Option<IndexEntry>
    where
        F: Fn(&IndexEntry) -> bool,
    {
        let idx = self.maps.get(seqname)?;
        let cut = idx.by_start.partition_point(|e| e.start <= pos);
        idx.by_start[cut..].iter().find(|e| accept(e)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_index() -> StoreIndex {
        let intervals = vec![
            Interval::new("chr1", 100, 200, Strand::Plus).unwrap(),
            Interval::new("chr1", 150, 250, Strand::Minus).unwrap(),
            Interval::new("chr1", 400, 500, Strand::Plus).unwrap(),
            Interval::new("chr2", 1, 50, Strand::Unstranded).unwrap(),
            Interval::new("chr1", 300, 500, Strand::Minus).unwrap(),
        ];
        StoreIndex::build(&intervals)
    }

    #[test]
    fn test_overlapping_closed_bounds() {
        let index = create_test_index();

        // end coordinate is inclusive
        assert_eq!(index.overlapping("chr1", 200, 200), vec![0, 1]);
        assert_eq!(index.overlapping("chr1", 251, 299), Vec::<usize>::new());
        assert_eq!(index.overlapping("chr1", 1, 1000), vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_overlapping_open_ended_range() {
        let index = create_test_index();
        assert_eq!(index.overlapping("chr1", 450, u64::MAX), vec![2, 4]);
        assert_eq!(index.overlapping("chr2", 1, u64::MAX), vec![3]);
    }

    #[test]
    fn test_overlapping_unknown_seqname() {
        let index = create_test_index();
        assert!(index.overlapping("chrX", 1, 1000).is_empty());
    }

    #[test]
    fn test_nearest_before() {
        let index = create_test_index();

        let hit = index.nearest_before("chr1", 300, |_| true).unwrap();
        assert_eq!(hit.row, 1);

        let plus = index.nearest_before("chr1", 300, |e| e.strand == Strand::Plus).unwrap();
        assert_eq!(plus.row, 0);

        assert!(index.nearest_before("chr1", 100, |_| true).is_none());
    }

    #[test]
    fn test_nearest_before_prefers_smaller_start_on_tie() {
        let index = create_test_index();
        // rows 2 and 4 both end at 500
        let hit = index.nearest_before("chr1", 600, |_| true).unwrap();
        assert_eq!(hit.row, 4);
    }

    #[test]
    fn test_nearest_after() {
        let index = create_test_index();

        let hit = index.nearest_after("chr1", 250, |_| true).unwrap();
        assert_eq!(hit.row, 4);

        let plus = index.nearest_after("chr1", 250, |e| e.strand == Strand::Plus).unwrap();
        assert_eq!(plus.row, 2);

        assert!(index.nearest_after("chr1", 400, |_| true).is_none());
    }
}
