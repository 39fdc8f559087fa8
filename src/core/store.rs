//! Interval store and its verbs
//!
//! An [`IntervalStore`] is an ordered, immutable collection of intervals
//! sharing one attribute schema. Every verb returns a new store; grouping
//! keys and the resize anchor are plain fields of the value, so a store
//! can be shared across threads without synchronization. The overlap
//! index is built lazily on first use and cached for the lifetime of the
//! store instance.

use crate::core::arith::{self, Anchor};
use crate::core::error::{RangesError, Result};
use crate::core::expr::{EvalContext, Expr, Frame};
use crate::core::genome::GenomeInfo;
use crate::core::index::StoreIndex;
use crate::core::table::Table;
use crate::core::{Interval, Strand, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

/// Columns every store exposes, derived from the interval coordinates
pub const CORE_COLUMNS: [&str; 5] = ["seqname", "start", "end", "width", "strand"];

/// Sort key for [`IntervalStore::arrange`]
#[derive(Debug, Clone)]
pub struct SortKey {
    pub expr: Expr,
    pub descending: bool,
}

/// Ascending sort key
pub fn asc(expr: Expr) -> SortKey {
    SortKey {
        expr,
        descending: false,
    }
}

/// Descending sort key; missing values still sort last
pub fn desc(expr: Expr) -> SortKey {
    SortKey {
        expr,
        descending: true,
    }
}

#[derive(Clone, Default)]
pub struct IntervalStore {
    intervals: Vec<Interval>,
    schema: Vec<String>,
    groups: Option<Vec<String>>,
    anchor: Anchor,
    genome: Option<GenomeInfo>,
    index: OnceLock<Arc<StoreIndex>>,
}

impl std::fmt::Debug for IntervalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalStore")
            .field("len", &self.intervals.len())
            .field("schema", &self.schema)
            .field("groups", &self.groups)
            .field("anchor", &self.anchor)
            .field("genome", &self.genome.as_ref().map(|g| &g.genome_id))
            .finish()
    }
}

impl PartialEq for IntervalStore {
    fn eq(&self, other: &Self) -> bool {
        self.intervals == other.intervals
            && self.schema == other.schema
            && self.groups == other.groups
            && self.anchor == other.anchor
            && self.genome == other.genome
    }
}

/// Collects intervals row by row; errors surface at [`StoreBuilder::build`]
pub struct StoreBuilder {
    schema: Vec<String>,
    intervals: Vec<Interval>,
    error: Option<RangesError>,
}

impl StoreBuilder {
    /// Add an interval with attributes in schema order
    pub fn add(
        mut self,
        seqname: &str,
        start: u64,
        end: u64,
        strand: Strand,
        attrs: Vec<Value>,
    ) -> Self {
        if self.error.is_none() {
            match Interval::new(seqname, start, end, strand) {
                Ok(iv) => self.intervals.push(iv.with_attrs(attrs)),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    pub fn build(self) -> Result<IntervalStore> {
        if let Some(e) = self.error {
            return Err(e);
        }
        IntervalStore::new(self.schema, self.intervals)
    }
}

impl IntervalStore {
    /// Create a store, checking that every interval carries one value per
    /// schema column and that column names are unique
    pub fn new(schema: Vec<String>, intervals: Vec<Interval>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in &schema {
            if CORE_COLUMNS.contains(&name.as_str()) {
                return Err(RangesError::InvalidContext(format!(
                    "'{}' is a coordinate column and cannot be an attribute",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(RangesError::InvalidContext(format!(
                    "duplicate column '{}'",
                    name
                )));
            }
        }
        for iv in &intervals {
            if iv.attrs().len() != schema.len() {
                return Err(RangesError::InvalidContext(format!(
                    "{} carries {} attributes, schema has {} columns",
                    iv,
                    iv.attrs().len(),
                    schema.len()
                )));
            }
        }
        Ok(Self {
            intervals,
            schema,
            ..Default::default()
        })
    }

    /// Store without attribute columns
    pub fn from_intervals(intervals: Vec<Interval>) -> Result<Self> {
        Self::new(Vec::new(), intervals)
    }

    /// Start building a store with the given attribute columns
    ///
    /// # Examples
    /// ```
    /// use tidyranges::core::{IntervalStore, Strand, Value};
    /// let store = IntervalStore::builder(&["score"])
    ///     .add("chr1", 100, 200, Strand::Plus, vec![Value::Int(5)])
    ///     .add("chr1", 300, 400, Strand::Minus, vec![Value::Missing])
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(store.len(), 2);
    /// ```
    pub fn builder(schema: &[&str]) -> StoreBuilder {
        StoreBuilder {
            schema: schema.iter().map(|s| s.to_string()).collect(),
            intervals: Vec::new(),
            error: None,
        }
    }

    /// New store sharing this store's schema and settings
    fn derive(&self, intervals: Vec<Interval>) -> Self {
        Self {
            intervals,
            schema: self.schema.clone(),
            groups: self.groups.clone(),
            anchor: self.anchor,
            genome: self.genome.clone(),
            index: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    pub fn get(&self, row: usize) -> Option<&Interval> {
        self.intervals.get(row)
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Attribute column names, in order
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Active grouping keys
    pub fn groups(&self) -> Option<&[String]> {
        self.groups.as_deref()
    }

    pub fn anchor_point(&self) -> Anchor {
        self.anchor
    }

    pub fn genome(&self) -> Option<&GenomeInfo> {
        self.genome.as_ref()
    }

    /// Distinct sequence names in order of first appearance
    pub fn seqnames(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.intervals
            .iter()
            .map(|iv| iv.seqname())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// The overlap index, built on first use
    pub fn index(&self) -> &StoreIndex {
        self.index
            .get_or_init(|| Arc::new(StoreIndex::build(&self.intervals)))
    }

    /// Position of an attribute column in the schema
    pub fn attr_position(&self, column: &str) -> Option<usize> {
        self.schema.iter().position(|c| c == column)
    }

    /// All values of a column, core or attribute
    pub fn column(&self, column: &str) -> Result<Vec<Value>> {
        if !self.has_column(column) {
            return Err(RangesError::unknown_column(column, &self.column_names()));
        }
        (0..self.len()).map(|r| self.value(r, column)).collect()
    }

    /// Attach genome metadata, validating every interval against it
    pub fn with_genome(&self, genome: GenomeInfo) -> Result<Self> {
        for iv in &self.intervals {
            genome.validate(iv)?;
        }
        let mut out = self.derive(self.intervals.clone());
        out.genome = Some(genome);
        Ok(out)
    }

    /// Same intervals with a different resize anchor
    pub fn anchor(&self, anchor: Anchor) -> Self {
        let mut out = self.clone();
        out.anchor = anchor;
        out
    }

    /// Back to the default start anchor
    pub fn unanchor(&self) -> Self {
        self.anchor(Anchor::Start)
    }

    /// Keep rows for which every predicate is `true`
    ///
    /// Predicates are ANDed; a missing result drops the row. On a grouped
    /// store, aggregates inside a predicate range over the row's group.
    pub fn filter<I>(&self, predicates: I) -> Result<Self>
    where
        I: IntoIterator<Item = Expr>,
    {
        let predicates: Vec<Expr> = predicates.into_iter().collect();
        for p in &predicates {
            p.check_columns(self)?;
        }

        let mut keep = Vec::new();
        for (_, rows) in self.group_rows()? {
            let ctx = EvalContext::grouped(self, &rows);
            for &row in &rows {
                let mut passes = true;
                for p in &predicates {
                    match p.eval(&ctx, Some(row))? {
                        Value::Bool(true) => {}
                        Value::Bool(false) | Value::Missing => {
                            passes = false;
                            break;
                        }
                        other => {
                            return Err(RangesError::TypeMismatch(format!(
                                "filter predicate {:?} returned {} '{}'",
                                p,
                                other.type_name(),
                                other
                            )))
                        }
                    }
                }
                if passes {
                    keep.push(row);
                }
            }
        }

        keep.sort_unstable();
        log::debug!("filter kept {} of {} rows", keep.len(), self.len());
        Ok(self.take_rows(&keep))
    }

    /// Set `column` to the value of `expr` on every row
    ///
    /// Aggregates are computed per group (or over the whole store when
    /// ungrouped) and broadcast to each row. Setting `width` holds the
    /// store's anchor fixed; setting `start` keeps `end` and setting `end`
    /// keeps `start`.
    ///
    /// # Examples
    /// ```
    /// use tidyranges::core::{IntervalStore, Interval, Strand};
    /// use tidyranges::core::expr::{col, lit};
    /// let store = IntervalStore::from_intervals(vec![
    ///     Interval::new("chr1", 100, 200, Strand::Unstranded).unwrap(),
    /// ]).unwrap();
    /// let wider = store.mutate("width", col("width") + lit(1)).unwrap();
    /// assert_eq!(wider.get(0).unwrap().end(), 201);
    /// ```
    pub fn mutate(&self, column: &str, expr: Expr) -> Result<Self> {
        expr.check_columns(self)?;

        let mut values = vec![Value::Missing; self.len()];
        for (_, rows) in self.group_rows()? {
            let ctx = EvalContext::grouped(self, &rows);
            for &row in &rows {
                values[row] = expr.eval(&ctx, Some(row))?;
            }
        }
        self.assign(column, values)
    }

    /// Apply several mutations in order, each seeing the previous result
    pub fn mutate_all<'a, I>(&self, mutations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Expr)>,
    {
        let mut out = self.clone();
        for (column, expr) in mutations {
            out = out.mutate(column, expr)?;
        }
        Ok(out)
    }

    fn assign(&self, column: &str, values: Vec<Value>) -> Result<Self> {
        let coordinate = |v: &Value, row: usize| -> Result<i64> {
            v.as_i64().ok_or_else(|| {
                RangesError::InvalidRange(format!(
                    "row {}: {} must be an integer, got {} '{}'",
                    row,
                    column,
                    v.type_name(),
                    v
                ))
            })
        };

        let mut out = Vec::with_capacity(self.len());
        match column {
            "start" | "end" | "width" => {
                for (row, (iv, v)) in self.intervals.iter().zip(&values).enumerate() {
                    let x = coordinate(v, row)?;
                    let updated = match column {
                        "start" => iv.with_coords(x, iv.end() as i64)?,
                        "end" => iv.with_coords(iv.start() as i64, x)?,
                        _ => arith::resize(iv, x, self.anchor)?,
                    };
                    self.check_bounds(&updated)?;
                    out.push(updated);
                }
                Ok(self.derive(out))
            }
            "seqname" => {
                for (iv, v) in self.intervals.iter().zip(values) {
                    match v {
                        Value::Str(s) => out.push(iv.clone().with_seqname(s)),
                        other => {
                            return Err(RangesError::TypeMismatch(format!(
                                "seqname must be a string, got {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                let mut store = self.derive(out);
                store.genome = None;
                Ok(store)
            }
            "strand" => {
                for (iv, v) in self.intervals.iter().zip(values) {
                    let strand = match &v {
                        Value::Missing => Some(Strand::Unstranded),
                        Value::Str(s) => Strand::parse(s),
                        _ => None,
                    }
                    .ok_or_else(|| {
                        RangesError::TypeMismatch(format!("'{}' is not a strand", v))
                    })?;
                    out.push(iv.clone().with_strand(strand));
                }
                Ok(self.derive(out))
            }
            _ => {
                let mut store = self.derive(Vec::new());
                match self.attr_position(column) {
                    Some(pos) => {
                        for (iv, v) in self.intervals.iter().zip(values) {
                            let mut iv = iv.clone();
                            iv.attrs_mut()[pos] = v;
                            out.push(iv);
                        }
                    }
                    None => {
                        store.schema.push(column.to_string());
                        for (iv, v) in self.intervals.iter().zip(values) {
                            let mut iv = iv.clone();
                            iv.attrs_mut().push(v);
                            out.push(iv);
                        }
                    }
                }
                store.intervals = out;
                Ok(store)
            }
        }
    }

    /// Keep only the named attribute columns, in the given order
    ///
    /// Coordinate columns are always kept and may be named. Grouping keys
    /// that were not selected are retained after the selection.
    pub fn select(&self, columns: &[&str]) -> Result<Self> {
        let mut names: Vec<String> = Vec::new();
        for &c in columns {
            if CORE_COLUMNS.contains(&c) {
                continue;
            }
            if self.attr_position(c).is_none() {
                return Err(RangesError::unknown_column(c, &self.column_names()));
            }
            if !names.iter().any(|n| n == c) {
                names.push(c.to_string());
            }
        }
        for key in self.groups.iter().flatten() {
            if self.attr_position(key).is_some() && !names.contains(key) {
                log::debug!("select: keeping grouping column '{}'", key);
                names.push(key.clone());
            }
        }

        let positions: Vec<usize> = names
            .iter()
            .filter_map(|n| self.attr_position(n))
            .collect();
        let intervals = self
            .intervals
            .iter()
            .map(|iv| {
                let attrs = positions.iter().map(|&p| iv.attrs()[p].clone()).collect();
                iv.clone().with_attrs(attrs)
            })
            .collect();

        let mut out = self.derive(intervals);
        out.schema = names;
        Ok(out)
    }

    /// Stable sort by the given keys; missing values sort last
    pub fn arrange(&self, keys: &[SortKey]) -> Result<Self> {
        for k in keys {
            k.expr.check_columns(self)?;
        }

        let all: Vec<usize> = (0..self.len()).collect();
        let ctx = EvalContext::grouped(self, &all);
        let mut rows: Vec<(usize, Vec<Value>)> = Vec::with_capacity(self.len());
        for &row in &all {
            let vals = keys
                .iter()
                .map(|k| k.expr.eval(&ctx, Some(row)))
                .collect::<Result<Vec<_>>>()?;
            rows.push((row, vals));
        }

        rows.sort_by(|(_, a), (_, b)| {
            for (k, (x, y)) in keys.iter().zip(a.iter().zip(b)) {
                let ord = if k.descending && !x.is_missing() && !y.is_missing() {
                    y.sort_cmp(x)
                } else {
                    x.sort_cmp(y)
                };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });

        let order: Vec<usize> = rows.into_iter().map(|(r, _)| r).collect();
        Ok(self.take_rows(&order))
    }

    /// Sort by seqname, start, end (stable)
    pub fn sort_by_position(&self) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            let (x, y) = (&self.intervals[a], &self.intervals[b]);
            (x.seqname(), x.start(), x.end()).cmp(&(y.seqname(), y.start(), y.end()))
        });
        self.take_rows(&order)
    }

    /// Mark the store as grouped by `keys`; storage order is unchanged
    pub fn group_by(&self, keys: &[&str]) -> Result<Self> {
        for &k in keys {
            if !self.has_column(k) {
                return Err(RangesError::unknown_column(k, &self.column_names()));
            }
        }
        let mut out = self.clone();
        out.groups = Some(keys.iter().map(|k| k.to_string()).collect());
        Ok(out)
    }

    /// Drop any grouping
    pub fn ungroup(&self) -> Self {
        let mut out = self.clone();
        out.groups = None;
        out
    }

    /// Number of groups (1 when ungrouped)
    pub fn n_groups(&self) -> Result<usize> {
        Ok(self.group_rows()?.len())
    }

    /// Collapse each group into one row of a [`Table`]
    ///
    /// Output columns are the grouping keys followed by the named
    /// aggregations; groups appear in order of first appearance. A column
    /// referenced outside an aggregate is an invalid context.
    pub fn summarise<'a, I>(&self, aggregations: I) -> Result<Table>
    where
        I: IntoIterator<Item = (&'a str, Expr)>,
    {
        let aggregations: Vec<(&str, Expr)> = aggregations.into_iter().collect();
        for (_, e) in &aggregations {
            e.check_columns(self)?;
        }

        let mut columns: Vec<String> = self.groups.clone().unwrap_or_default();
        columns.extend(aggregations.iter().map(|(name, _)| name.to_string()));

        let mut out = Vec::new();
        for (key, rows) in self.group_rows()? {
            let ctx = EvalContext::grouped(self, &rows);
            let mut row = key;
            for (_, e) in &aggregations {
                row.push(e.eval(&ctx, None)?);
            }
            out.push(row);
        }
        Ok(Table::new(columns, out))
    }

    /// Rows of each group with the group's key values, in order of first
    /// appearance. An ungrouped store is one group holding every row.
    pub fn group_rows(&self) -> Result<Vec<(Vec<Value>, Vec<usize>)>> {
        let keys = match &self.groups {
            None => return Ok(vec![(Vec::new(), (0..self.len()).collect())]),
            Some(keys) => keys,
        };

        let mut slots: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
        for row in 0..self.len() {
            let key = keys
                .iter()
                .map(|k| self.value(row, k))
                .collect::<Result<Vec<_>>>()?;
            match slots.get(&key) {
                Some(&slot) => groups[slot].1.push(row),
                None => {
                    slots.insert(key.clone(), groups.len());
                    groups.push((key, vec![row]));
                }
            }
        }
        Ok(groups)
    }

    /// Store made of the given rows, in the given order
    pub(crate) fn take_rows(&self, rows: &[usize]) -> Self {
        self.derive(rows.iter().map(|&r| self.intervals[r].clone()).collect())
    }

    fn map_intervals<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&Interval) -> Result<Interval>,
    {
        let intervals = self
            .intervals
            .iter()
            .map(|iv| {
                let out = f(iv)?;
                self.check_bounds(&out)?;
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.derive(intervals))
    }

    /// Coordinates produced by a verb must stay inside the attached genome
    fn check_bounds(&self, iv: &Interval) -> Result<()> {
        match &self.genome {
            Some(genome) => genome.validate(iv),
            None => Ok(()),
        }
    }

    /// Grow every interval by `extend` bases around the store's anchor
    pub fn stretch(&self, extend: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::stretch(iv, extend, self.anchor))
    }

    /// Set every width to `width`, holding the store's anchor fixed
    pub fn resize(&self, width: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::resize(iv, width, self.anchor))
    }

    /// Flanks before the start, ignoring strand
    pub fn flank_left(&self, width: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::flank(iv, width, false, false))
    }

    /// Flanks after the end, ignoring strand
    pub fn flank_right(&self, width: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::flank(iv, width, true, false))
    }

    /// Flanks on the 5' side
    pub fn flank_upstream(&self, width: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::flank(iv, width, false, true))
    }

    /// Flanks on the 3' side
    pub fn flank_downstream(&self, width: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::flank(iv, width, true, true))
    }

    pub fn shift_left(&self, offset: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::shift(iv, -offset, false))
    }

    pub fn shift_right(&self, offset: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::shift(iv, offset, false))
    }

    pub fn shift_upstream(&self, offset: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::shift(iv, -offset, true))
    }

    pub fn shift_downstream(&self, offset: i64) -> Result<Self> {
        self.map_intervals(|iv| arith::shift(iv, offset, true))
    }
}

impl Frame for IntervalStore {
    fn value(&self, row: usize, column: &str) -> Result<Value> {
        let iv = self.intervals.get(row).ok_or_else(|| {
            RangesError::InvalidRange(format!("row {} out of bounds ({} rows)", row, self.len()))
        })?;
        let v = match column {
            "seqname" => Value::Str(iv.seqname().to_string()),
            "start" => Value::Int(iv.start() as i64),
            "end" => Value::Int(iv.end() as i64),
            "width" => Value::Int(iv.width() as i64),
            "strand" => Value::Str(iv.strand().to_string()),
            _ => match self.attr_position(column) {
                Some(pos) => iv.attrs()[pos].clone(),
                None => return Err(RangesError::unknown_column(column, &self.column_names())),
            },
        };
        Ok(v)
    }

    fn has_column(&self, column: &str) -> bool {
        CORE_COLUMNS.contains(&column) || self.attr_position(column).is_some()
    }

    fn column_names(&self) -> Vec<String> {
        CORE_COLUMNS
            .iter()
            .map(|s| s.to_string())
            .chain(self.schema.iter().cloned())
            .collect()
    }
}

impl<'a> IntoIterator for &'a IntervalStore {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expr::{col, lit, map, mean, n, sum};

    fn genes() -> IntervalStore {
        IntervalStore::builder(&["gene", "score"])
            .add("chr1", 100, 200, Strand::Plus, vec!["a".into(), Value::Int(1)])
            .add("chr1", 300, 400, Strand::Minus, vec!["b".into(), Value::Int(5)])
            .add("chr2", 50, 80, Strand::Plus, vec!["a".into(), Value::Int(3)])
            .add("chr1", 10, 20, Strand::Unstranded, vec!["c".into(), Value::Missing])
            .build()
            .unwrap()
    }

    fn coords(store: &IntervalStore) -> Vec<(u64, u64)> {
        store.iter().map(|iv| (iv.start(), iv.end())).collect()
    }

    #[test]
    fn test_builder_rejects_bad_interval() {
        let err = IntervalStore::builder(&[])
            .add("chr1", 200, 100, Strand::Plus, vec![])
            .build()
            .unwrap_err();
        assert!(matches!(err, RangesError::InvalidRange(_)));
    }

    #[test]
    fn test_new_rejects_ragged_attributes() {
        let iv = Interval::new("chr1", 1, 2, Strand::Plus).unwrap();
        assert!(IntervalStore::new(vec!["score".to_string()], vec![iv]).is_err());
    }

    #[test]
    fn test_new_rejects_core_column_attribute() {
        assert!(IntervalStore::new(vec!["start".to_string()], vec![]).is_err());
    }

    #[test]
    fn test_filter_conjunction() {
        let s = genes();
        let out = s
            .filter([col("seqname").eq(lit("chr1")), col("score").gt(lit(2))])
            .unwrap();
        assert_eq!(coords(&out), vec![(300, 400)]);
    }

    #[test]
    fn test_filter_disjunction() {
        let s = genes();
        let out = s
            .filter([col("score").eq(lit(1)).or(col("score").eq(lit(3)))])
            .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_filter_missing_drops_row() {
        let s = genes();
        let out = s.filter([col("score").ge(lit(0))]).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_filter_unknown_column() {
        let err = genes().filter([col("gc").gt(lit(0))]).unwrap_err();
        assert!(matches!(err, RangesError::Schema { .. }));
    }

    #[test]
    fn test_filter_non_boolean_predicate() {
        let err = genes().filter([col("score")]).unwrap_err();
        assert!(matches!(err, RangesError::TypeMismatch(_)));
    }

    #[test]
    fn test_filter_grouped_aggregate() {
        let s = genes().group_by(&["seqname"]).unwrap();
        // chr1 mean(score) = 3, chr2 mean(score) = 3
        let out = s.filter([col("score").ge(mean(col("score")))]).unwrap();
        assert_eq!(coords(&out), vec![(300, 400), (50, 80)]);
        assert_eq!(out.groups(), Some(&["seqname".to_string()][..]));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let s = genes();
        let p = col("width").gt(lit(20));
        let once = s.filter([p.clone()]).unwrap();
        let twice = once.filter([p]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_mutate_width_start_anchor() {
        let s = genes();
        let out = s.mutate("width", col("width") + lit(1)).unwrap();
        assert_eq!(out.get(0).unwrap().start(), 100);
        assert_eq!(out.get(0).unwrap().end(), 201);
    }

    #[test]
    fn test_mutate_width_end_anchor() {
        let s = genes().anchor(Anchor::End);
        let out = s.mutate("width", lit(10)).unwrap();
        assert_eq!(coords(&out)[0], (191, 200));
    }

    #[test]
    fn test_mutate_width_negative_is_invalid_range() {
        let err = genes().mutate("width", lit(-1)).unwrap_err();
        assert!(matches!(err, RangesError::InvalidRange(_)));
    }

    #[test]
    fn test_mutate_start_keeps_end() {
        let out = genes().mutate("start", col("start") - lit(5)).unwrap();
        assert_eq!(coords(&out)[0], (95, 200));
    }

    #[test]
    fn test_mutate_grouped_broadcast() {
        let s = genes().group_by(&["gene"]).unwrap();
        let out = s.mutate("total", sum(col("score"))).unwrap();
        let totals = out.column("total").unwrap();
        assert_eq!(
            totals,
            vec![Value::Int(4), Value::Int(5), Value::Int(4), Value::Int(0)]
        );
    }

    #[test]
    fn test_mutate_ungrouped_aggregate_is_global() {
        let out = genes().mutate("n", n()).unwrap();
        assert!(out.column("n").unwrap().iter().all(|v| *v == Value::Int(4)));
    }

    #[test]
    fn test_mutate_replaces_existing_attribute() {
        let out = genes().mutate("score", lit(0)).unwrap();
        assert_eq!(out.schema(), genes().schema());
        assert_eq!(out.column("score").unwrap()[3], Value::Int(0));
    }

    #[test]
    fn test_mutate_strand_and_seqname() {
        let out = genes()
            .mutate_all([("strand", lit("-")), ("seqname", lit("chrX"))])
            .unwrap();
        assert!(out.iter().all(|iv| iv.strand() == Strand::Minus));
        assert_eq!(out.seqnames(), vec!["chrX"]);
    }

    #[test]
    fn test_mutate_with_closure() {
        let out = genes()
            .mutate(
                "long",
                map(|row| Ok(Value::Bool(row.get("width")?.as_i64().unwrap_or(0) > 50))),
            )
            .unwrap();
        assert_eq!(out.column("long").unwrap()[0], Value::Bool(true));
        assert_eq!(out.column("long").unwrap()[2], Value::Bool(false));
    }

    #[test]
    fn test_mutate_invalidates_index() {
        let s = genes();
        assert_eq!(s.index().overlapping("chr1", 150, 150), vec![0]);
        let moved = s.shift_right(1000).unwrap();
        assert!(moved.index().overlapping("chr1", 150, 150).is_empty());
    }

    #[test]
    fn test_select_keeps_grouping_keys() {
        let s = genes().group_by(&["gene"]).unwrap();
        let out = s.select(&["score", "start"]).unwrap();
        assert_eq!(out.schema(), &["score".to_string(), "gene".to_string()]);
        assert!(genes().select(&["gc"]).is_err());
    }

    #[test]
    fn test_arrange() {
        let out = genes().arrange(&[desc(col("score"))]).unwrap();
        let scores = out.column("score").unwrap();
        assert_eq!(
            scores,
            vec![Value::Int(5), Value::Int(3), Value::Int(1), Value::Missing]
        );

        let out = genes().arrange(&[asc(col("seqname")), asc(col("start"))]).unwrap();
        assert_eq!(coords(&out), vec![(10, 20), (100, 200), (300, 400), (50, 80)]);
    }

    #[test]
    fn test_sort_by_position() {
        let out = genes().sort_by_position();
        assert_eq!(coords(&out), vec![(10, 20), (100, 200), (300, 400), (50, 80)]);
    }

    #[test]
    fn test_group_round_trip() {
        let s = genes();
        let round = s.group_by(&["gene"]).unwrap().ungroup();
        assert_eq!(round, s);
        assert!(round.groups().is_none());
    }

    #[test]
    fn test_group_by_unknown_key() {
        assert!(matches!(
            genes().group_by(&["tissue"]),
            Err(RangesError::Schema { .. })
        ));
    }

    #[test]
    fn test_summarise_grouped() {
        let s = genes().group_by(&["gene"]).unwrap();
        let t = s
            .summarise([("n", n()), ("mean_score", mean(col("score")))])
            .unwrap();
        assert_eq!(t.columns(), &["gene", "n", "mean_score"]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.rows()[0], vec!["a".into(), Value::Int(2), Value::Float(2.0)]);
        assert_eq!(t.rows()[2], vec!["c".into(), Value::Int(1), Value::Missing]);
    }

    #[test]
    fn test_summarise_ungrouped() {
        let t = genes().summarise([("total_width", sum(col("width")))]).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0][0], Value::Int(101 + 101 + 31 + 11));
    }

    #[test]
    fn test_summarise_bare_column_is_invalid_context() {
        let err = genes().summarise([("s", col("score"))]).unwrap_err();
        assert!(matches!(err, RangesError::InvalidContext(_)));
    }

    #[test]
    fn test_n_groups() {
        assert_eq!(genes().n_groups().unwrap(), 1);
        assert_eq!(genes().group_by(&["seqname", "gene"]).unwrap().n_groups().unwrap(), 4);
    }

    #[test]
    fn test_store_arithmetic_is_atomic() {
        let err = genes().shift_left(60).unwrap_err();
        assert!(matches!(err, RangesError::InvalidRange(_)));
    }

    #[test]
    fn test_flank_store() {
        let out = genes().flank_downstream(8).unwrap();
        assert_eq!(coords(&out)[0], (201, 208));
        assert_eq!(coords(&out)[1], (292, 299));
    }

    #[test]
    fn test_stretch_center() {
        let out = genes().anchor(Anchor::Center).stretch(10).unwrap();
        assert_eq!(coords(&out)[0], (95, 205));
    }

    #[test]
    fn test_with_genome_validates() {
        let small = GenomeInfo::new("toy").with_seq("chr1", 1000).with_seq("chr2", 100);
        assert!(genes().with_genome(small).is_ok());
        let tiny = GenomeInfo::new("toy").with_seq("chr1", 150).with_seq("chr2", 100);
        assert!(genes().with_genome(tiny).is_err());
    }

    fn bounded() -> IntervalStore {
        IntervalStore::builder(&[])
            .add("chr1", 900, 950, Strand::Plus, vec![])
            .build()
            .unwrap()
            .with_genome(GenomeInfo::new("toy").with_seq("chr1", 1000))
            .unwrap()
    }

    #[test]
    fn test_arithmetic_stays_within_genome() {
        let store = bounded();
        let err = store.shift_right(500).unwrap_err();
        assert!(matches!(err, RangesError::InvalidRange(_)));
        assert!(store.flank_downstream(200).is_err());
        assert!(store.stretch(100).is_err());

        let moved = store.shift_right(50).unwrap();
        assert_eq!(coords(&moved), vec![(950, 1000)]);
        assert_eq!(moved.genome().map(|g| g.genome_id.as_str()), Some("toy"));
    }

    #[test]
    fn test_mutate_coordinates_within_genome() {
        let store = bounded();
        let err = store.mutate("end", col("end") + lit(5000)).unwrap_err();
        assert!(matches!(err, RangesError::InvalidRange(_)));
        assert!(store.mutate("width", lit(500)).is_err());
        assert_eq!(coords(&store.mutate("end", lit(1000)).unwrap()), vec![(900, 1000)]);
    }
}
