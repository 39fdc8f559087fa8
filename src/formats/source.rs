//! Record sources
//!
//! Anything that yields canonical interval records (1-based closed
//! coordinates plus attributes in schema order) can feed a store. A
//! region filter restricts which records are materialized.

use crate::core::{Interval, IntervalStore, Result};

/// Streaming producer of canonical interval records
pub trait RecordSource {
    /// Attribute column names, in the order records carry their values
    fn schema(&self) -> &[String];

    /// Next record, `None` at end of input
    fn next_record(&mut self) -> Option<Result<Interval>>;

    /// Drain the source into a store
    ///
    /// With a region filter only records overlapping at least one region
    /// interval are kept. Region strands are ignored.
    fn collect_store(mut self, region: Option<&IntervalStore>) -> Result<IntervalStore>
    where
        Self: Sized,
    {
        let schema = self.schema().to_vec();
        let mut intervals = Vec::new();
        let mut dropped = 0usize;

        while let Some(record) = self.next_record() {
            let iv = record?;
            if let Some(region) = region {
                if !overlaps_region(region, &iv) {
                    dropped += 1;
                    continue;
                }
            }
            intervals.push(iv);
        }

        if region.is_some() {
            log::debug!(
                "Region filter kept {} records, dropped {}",
                intervals.len(),
                dropped
            );
        }
        IntervalStore::new(schema, intervals)
    }
}

fn overlaps_region(region: &IntervalStore, iv: &Interval) -> bool {
    !region
        .index()
        .overlapping(iv.seqname(), iv.start(), iv.end())
        .is_empty()
}

/// In-memory source over prebuilt intervals
#[derive(Debug, Clone)]
pub struct VecSource {
    schema: Vec<String>,
    records: std::vec::IntoIter<Interval>,
}

impl VecSource {
    pub fn new(schema: Vec<String>, records: Vec<Interval>) -> Self {
        Self {
            schema,
            records: records.into_iter(),
        }
    }
}

impl RecordSource for VecSource {
    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn next_record(&mut self) -> Option<Result<Interval>> {
        self.records.next().map(Ok)
    }
}
