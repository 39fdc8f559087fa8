//! Genomic interval record
//!
//! Coordinates are 1-based and closed: `start..=end`, `width = end - start + 1`.
//! The overlap index works on half-open `[start, end + 1)` internally, but
//! nothing outside `core::index` sees that representation.

use crate::core::error::{RangesError, Result};
use crate::core::{Strand, Value};

/// A genomic interval with its attribute payload
///
/// The attribute vector is positionally aligned with the schema of the
/// store that owns the interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    seqname: String,
    start: u64,
    end: u64,
    strand: Strand,
    attrs: Vec<Value>,
}

impl Interval {
    /// Create an interval, validating `1 <= start <= end`
    ///
    /// # Examples
    /// ```
    /// use tidyranges::core::{Interval, Strand};
    /// let iv = Interval::new("chr1", 100, 200, Strand::Plus).unwrap();
    /// assert_eq!(iv.width(), 101);
    /// assert!(Interval::new("chr1", 200, 100, Strand::Plus).is_err());
    /// ```
    pub fn new(seqname: impl Into<String>, start: u64, end: u64, strand: Strand) -> Result<Self> {
        Self::from_signed(seqname.into(), start as i64, end as i64, strand, Vec::new())
    }

    /// Create an interval from signed coordinates produced by arithmetic
    pub(crate) fn from_signed(
        seqname: String,
        start: i64,
        end: i64,
        strand: Strand,
        attrs: Vec<Value>,
    ) -> Result<Self> {
        if start < 1 || end < start {
            return Err(RangesError::range(start, end));
        }
        Ok(Self {
            seqname,
            start: start as u64,
            end: end as u64,
            strand,
            attrs,
        })
    }

    /// Replace the attribute payload
    pub fn with_attrs(mut self, attrs: Vec<Value>) -> Self {
        self.attrs = attrs;
        self
    }

    /// Same interval on another seqname
    pub fn with_seqname(mut self, seqname: impl Into<String>) -> Self {
        self.seqname = seqname.into();
        self
    }

    /// Same interval on another strand
    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    /// Same payload with new coordinates
    pub fn with_coords(&self, start: i64, end: i64) -> Result<Self> {
        Self::from_signed(self.seqname.clone(), start, end, self.strand, self.attrs.clone())
    }

    pub fn seqname(&self) -> &str {
        &self.seqname
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn width(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn attrs(&self) -> &[Value] {
        &self.attrs
    }

    pub(crate) fn attrs_mut(&mut self) -> &mut Vec<Value> {
        &mut self.attrs
    }

    /// Closed-coordinate overlap test, ignoring strand
    ///
    /// # Examples
    /// ```
    /// use tidyranges::core::{Interval, Strand};
    /// let a = Interval::new("chr1", 100, 200, Strand::Plus).unwrap();
    /// let b = Interval::new("chr1", 200, 300, Strand::Minus).unwrap();
    /// let c = Interval::new("chr1", 201, 300, Strand::Plus).unwrap();
    /// assert!(a.overlaps(&b));
    /// assert!(!a.overlaps(&c));
    /// ```
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.seqname == other.seqname && self.start <= other.end && other.start <= self.end
    }

    /// True when `self` lies entirely within `other`
    pub fn within(&self, other: &Interval) -> bool {
        self.seqname == other.seqname && other.start <= self.start && self.end <= other.end
    }

    /// Number of bases shared with `other` (0 when disjoint)
    pub fn overlap_width(&self, other: &Interval) -> u64 {
        if self.seqname != other.seqname {
            return 0;
        }
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start > end {
            0
        } else {
            end - start + 1
        }
    }

    /// Number of bases strictly between two intervals on the same sequence
    ///
    /// Overlapping and adjacent intervals are at distance 0; intervals on
    /// different sequences have no distance.
    pub fn distance(&self, other: &Interval) -> Option<u64> {
        if self.seqname != other.seqname {
            return None;
        }
        if other.end < self.start {
            Some(self.start - other.end - 1)
        } else if self.end < other.start {
            Some(other.start - self.end - 1)
        } else {
            Some(0)
        }
    }

    /// Intersection range carrying `self`'s strand and attributes
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        self.with_coords(start as i64, end as i64).ok()
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}:{}", self.seqname, self.start, self.end, self.strand)
    }
}
