//! Overlap and proximity joins
//!
//! The join algorithm:
//! 1. Check that both stores carry compatible genome metadata
//! 2. Build (or reuse) the subject store's per-sequence index
//! 3. For each query interval, collect subject hits from the index
//! 4. Materialize the hits as a new store
//!
//! Hits are computed in parallel over query intervals but always come out
//! in ascending query order, then ascending subject order.

use crate::core::error::{RangesError, Result};
use crate::core::genome::check_genomes;
use crate::core::index::IndexEntry;
use crate::core::{Interval, IntervalStore, Strand, Value};
use rayon::prelude::*;

/// A matched pair of query/subject rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub query: usize,
    pub subject: usize,
    /// Bases between the two intervals (proximity joins only)
    pub distance: Option<u64>,
}

/// Predicate settings for overlap joins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapOptions {
    /// Require identical strands; `*` only matches `*`
    pub directed: bool,
    /// Require the query to lie within the subject
    pub within: bool,
    /// Extend each query by this many bases on both sides before testing
    pub slack: u64,
    /// Minimum number of shared bases (after slack)
    pub min_overlap: u64,
}

impl Default for OverlapOptions {
    fn default() -> Self {
        Self {
            directed: false,
            within: false,
            slack: 0,
            min_overlap: 1,
        }
    }
}

impl OverlapOptions {
    pub fn directed(mut self) -> Self {
        self.directed = true;
        self
    }

    pub fn within(mut self) -> Self {
        self.within = true;
        self
    }

    pub fn with_slack(mut self, slack: u64) -> Self {
        self.slack = slack;
        self
    }

    pub fn with_min_overlap(mut self, min_overlap: u64) -> Self {
        self.min_overlap = min_overlap.max(1);
        self
    }

    /// Check a candidate pair against the predicate
    fn accepts(&self, q: &Interval, s: &Interval) -> bool {
        if self.directed && q.strand() != s.strand() {
            return false;
        }
        if self.within && !q.within(s) {
            return false;
        }
        let qs = q.start().saturating_sub(self.slack).max(1);
        let qe = q.end().saturating_add(self.slack);
        let shared_start = qs.max(s.start());
        let shared_end = qe.min(s.end());
        shared_start <= shared_end && shared_end - shared_start + 1 >= self.min_overlap
    }
}

/// Join kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Intersect,
    Nearest,
    Follow,
    Precede,
}

/// Which neighbour a proximity search looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    /// Closest subject on either side, overlaps first
    Nearest,
    /// Closest subject strictly upstream of the query
    Follow,
    /// Closest subject strictly downstream of the query
    Precede,
}

/// Output settings for joins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOptions {
    pub overlap: OverlapOptions,
    /// Appended to query / subject column names that clash
    pub suffixes: (String, String),
    /// Add a distance column with this name (proximity joins only)
    pub distance_column: Option<String>,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            overlap: OverlapOptions::default(),
            suffixes: (".x".to_string(), ".y".to_string()),
            distance_column: None,
        }
    }
}

impl JoinOptions {
    pub fn with_overlap(mut self, overlap: OverlapOptions) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_suffixes(mut self, query: &str, subject: &str) -> Self {
        self.suffixes = (query.to_string(), subject.to_string());
        self
    }

    pub fn with_distance(mut self, column: &str) -> Self {
        self.distance_column = Some(column.to_string());
        self
    }
}

/// All overlap hits between `query` and `subject`
///
/// # Examples
/// ```
/// use tidyranges::core::{find_overlaps, Interval, IntervalStore, OverlapOptions, Strand};
/// let a = IntervalStore::from_intervals(vec![
///     Interval::new("chr1", 100, 200, Strand::Plus).unwrap(),
/// ]).unwrap();
/// let b = IntervalStore::from_intervals(vec![
///     Interval::new("chr1", 150, 250, Strand::Plus).unwrap(),
///     Interval::new("chr1", 300, 400, Strand::Plus).unwrap(),
/// ]).unwrap();
/// let hits = find_overlaps(&a, &b, &OverlapOptions::default()).unwrap();
/// assert_eq!(hits.len(), 1);
/// assert_eq!((hits[0].query, hits[0].subject), (0, 0));
/// ```
pub fn find_overlaps(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &OverlapOptions,
) -> Result<Vec<Hit>> {
    check_genomes(query.genome(), subject.genome())?;
    let index = subject.index();

    let per_query: Vec<Vec<Hit>> = query
        .intervals()
        .par_iter()
        .enumerate()
        .map(|(qi, q)| {
            let lo = q.start().saturating_sub(opts.slack).max(1);
            let hi = q.end().saturating_add(opts.slack);
            index
                .overlapping(q.seqname(), lo, hi)
                .into_iter()
                .filter(|&si| opts.accepts(q, &subject.intervals()[si]))
                .map(|si| Hit {
                    query: qi,
                    subject: si,
                    distance: None,
                })
                .collect()
        })
        .collect();

    let hits: Vec<Hit> = per_query.into_iter().flatten().collect();
    log::debug!(
        "find_overlaps: {} queries x {} subjects -> {} hits",
        query.len(),
        subject.len(),
        hits.len()
    );
    Ok(hits)
}

/// Number of overlap hits per query row
pub fn count_overlaps(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &OverlapOptions,
) -> Result<Vec<usize>> {
    let mut counts = vec![0; query.len()];
    for hit in find_overlaps(query, subject, opts)? {
        counts[hit.query] += 1;
    }
    Ok(counts)
}

/// At most one proximity hit per query row
///
/// `nearest` prefers overlapping subjects (distance 0), then the smallest
/// gap. Ties go to the subject with the smaller start, then the earlier
/// row. With `directed`, only same-strand subjects are candidates and
/// upstream/downstream follow the query's strand.
pub fn find_nearest(
    query: &IntervalStore,
    subject: &IntervalStore,
    mode: Proximity,
    directed: bool,
) -> Result<Vec<Hit>> {
    check_genomes(query.genome(), subject.genome())?;
    // build the index before fanning out
    subject.index();

    let hits: Vec<Hit> = query
        .intervals()
        .par_iter()
        .enumerate()
        .filter_map(|(qi, q)| {
            nearest_for(subject, q, mode, directed).map(|(row, distance)| Hit {
                query: qi,
                subject: row,
                distance: Some(distance),
            })
        })
        .collect();

    log::debug!(
        "find_nearest({:?}): {} of {} queries matched",
        mode,
        hits.len(),
        query.len()
    );
    Ok(hits)
}

fn nearest_for(
    subject: &IntervalStore,
    q: &Interval,
    mode: Proximity,
    directed: bool,
) -> Option<(usize, u64)> {
    let index = subject.index();
    let strand = q.strand();
    let accept = |e: &IndexEntry| !directed || e.strand == strand;
    let seq = q.seqname();

    let before = || {
        index
            .nearest_before(seq, q.start(), accept)
            .map(|e| (e.row, q.start() - e.end - 1))
    };
    let after = || {
        index
            .nearest_after(seq, q.end(), accept)
            .map(|e| (e.row, e.start - q.end() - 1))
    };
    let reverse = directed && strand == Strand::Minus;

    match mode {
        Proximity::Follow if reverse => after(),
        Proximity::Follow => before(),
        Proximity::Precede if reverse => before(),
        Proximity::Precede => after(),
        Proximity::Nearest => {
            let rows = subject.intervals();
            let overlapping = index
                .overlapping(seq, q.start(), q.end())
                .into_iter()
                .filter(|&row| !directed || rows[row].strand() == strand)
                .min_by_key(|&row| (rows[row].start(), row));
            if let Some(row) = overlapping {
                return Some((row, 0));
            }
            match (before(), after()) {
                (Some(b), Some(a)) => {
                    // the upstream candidate always has the smaller start
                    if a.1 < b.1 {
                        Some(a)
                    } else {
                        Some(b)
                    }
                }
                (b, a) => b.or(a),
            }
        }
    }
}

/// Attribute layout of a join result
struct JoinSchema {
    columns: Vec<String>,
}

impl JoinSchema {
    fn new(query: &IntervalStore, subject: &IntervalStore, opts: &JoinOptions) -> Self {
        let clash = |name: &String, other: &IntervalStore| other.schema().contains(name);
        let mut columns: Vec<String> = query
            .schema()
            .iter()
            .map(|c| {
                if clash(c, subject) {
                    format!("{}{}", c, opts.suffixes.0)
                } else {
                    c.clone()
                }
            })
            .collect();
        columns.extend(subject.schema().iter().map(|c| {
            if clash(c, query) {
                format!("{}{}", c, opts.suffixes.1)
            } else {
                c.clone()
            }
        }));
        Self { columns }
    }
}

fn combined_attrs(q: &Interval, s: Option<&Interval>, subject_width: usize) -> Vec<Value> {
    let mut attrs = q.attrs().to_vec();
    match s {
        Some(s) => attrs.extend(s.attrs().iter().cloned()),
        None => attrs.extend(std::iter::repeat(Value::Missing).take(subject_width)),
    }
    attrs
}

fn materialize(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &JoinOptions,
    rows: Vec<(Interval, Option<u64>)>,
    with_distance: bool,
) -> Result<IntervalStore> {
    let mut schema = JoinSchema::new(query, subject, opts).columns;
    let distance = match (&opts.distance_column, with_distance) {
        (Some(name), true) => {
            if schema.contains(name) {
                return Err(RangesError::InvalidContext(format!(
                    "distance column '{}' clashes with an existing column",
                    name
                )));
            }
            schema.push(name.clone());
            true
        }
        _ => false,
    };

    let intervals = rows
        .into_iter()
        .map(|(iv, d)| {
            if distance {
                let mut attrs = iv.attrs().to_vec();
                attrs.push(d.map(Value::from).unwrap_or_default());
                iv.with_attrs(attrs)
            } else {
                iv
            }
        })
        .collect();

    let mut out = IntervalStore::new(schema, intervals)?;
    if let Some(g) = query.genome() {
        out = out.with_genome(g.clone())?;
    }
    Ok(out)
}

fn rows_from_hits(
    query: &IntervalStore,
    subject: &IntervalStore,
    hits: &[Hit],
) -> Vec<(Interval, Option<u64>)> {
    hits.iter()
        .map(|h| {
            let q = &query.intervals()[h.query];
            let s = &subject.intervals()[h.subject];
            let attrs = combined_attrs(q, Some(s), subject.schema().len());
            (q.clone().with_attrs(attrs), h.distance)
        })
        .collect()
}

/// One row per overlap hit, with query coordinates and the attributes of
/// both sides
pub fn join_overlap_inner(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &JoinOptions,
) -> Result<IntervalStore> {
    let hits = find_overlaps(query, subject, &opts.overlap)?;
    let rows = rows_from_hits(query, subject, &hits);
    materialize(query, subject, opts, rows, false)
}

/// Every query row; unmatched queries get missing subject attributes
///
/// # Examples
/// ```
/// use tidyranges::core::{join_overlap_left, IntervalStore, JoinOptions, Strand, Value};
/// let a = IntervalStore::builder(&[])
///     .add("chr1", 1, 10, Strand::Unstranded, vec![])
///     .build().unwrap();
/// let b = IntervalStore::builder(&["gene"])
///     .add("chr1", 20, 30, Strand::Unstranded, vec!["g1".into()])
///     .build().unwrap();
/// let out = join_overlap_left(&a, &b, &JoinOptions::default()).unwrap();
/// assert_eq!(out.len(), 1);
/// assert_eq!(out.get(0).unwrap().attrs(), &[Value::Missing]);
/// ```
pub fn join_overlap_left(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &JoinOptions,
) -> Result<IntervalStore> {
    let hits = find_overlaps(query, subject, &opts.overlap)?;
    let width = subject.schema().len();

    let mut rows = Vec::with_capacity(hits.len().max(query.len()));
    let mut next = hits.iter().peekable();
    for (qi, q) in query.iter().enumerate() {
        let mut matched = false;
        while let Some(h) = next.next_if(|h| h.query == qi) {
            let s = &subject.intervals()[h.subject];
            rows.push((q.clone().with_attrs(combined_attrs(q, Some(s), width)), None));
            matched = true;
        }
        if !matched {
            rows.push((q.clone().with_attrs(combined_attrs(q, None, width)), None));
        }
    }
    materialize(query, subject, opts, rows, false)
}

/// One row per overlap hit, with coordinates replaced by the shared range
pub fn join_overlap_intersect(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &JoinOptions,
) -> Result<IntervalStore> {
    let hits = find_overlaps(query, subject, &opts.overlap)?;
    let width = subject.schema().len();

    let rows = hits
        .iter()
        .filter_map(|h| {
            let q = &query.intervals()[h.query];
            let s = &subject.intervals()[h.subject];
            // slack hits may not share any base
            let shared = q.intersect(s)?;
            Some((shared.with_attrs(combined_attrs(q, Some(s), width)), None))
        })
        .collect();
    materialize(query, subject, opts, rows, false)
}

fn join_proximity(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &JoinOptions,
    mode: Proximity,
) -> Result<IntervalStore> {
    let hits = find_nearest(query, subject, mode, opts.overlap.directed)?;
    let rows = rows_from_hits(query, subject, &hits);
    materialize(query, subject, opts, rows, true)
}

/// Each query joined to its nearest subject
pub fn join_nearest(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &JoinOptions,
) -> Result<IntervalStore> {
    join_proximity(query, subject, opts, Proximity::Nearest)
}

/// Each query joined to the closest subject upstream of it
pub fn join_follow(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &JoinOptions,
) -> Result<IntervalStore> {
    join_proximity(query, subject, opts, Proximity::Follow)
}

/// Each query joined to the closest subject downstream of it
pub fn join_precede(
    query: &IntervalStore,
    subject: &IntervalStore,
    opts: &JoinOptions,
) -> Result<IntervalStore> {
    join_proximity(query, subject, opts, Proximity::Precede)
}

/// Dispatch on a [`JoinKind`]
pub fn join(
    query: &IntervalStore,
    subject: &IntervalStore,
    kind: JoinKind,
    opts: &JoinOptions,
) -> Result<IntervalStore> {
    match kind {
        JoinKind::Inner => join_overlap_inner(query, subject, opts),
        JoinKind::Left => join_overlap_left(query, subject, opts),
        JoinKind::Intersect => join_overlap_intersect(query, subject, opts),
        JoinKind::Nearest => join_nearest(query, subject, opts),
        JoinKind::Follow => join_follow(query, subject, opts),
        JoinKind::Precede => join_precede(query, subject, opts),
    }
}
