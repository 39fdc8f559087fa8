//! Tabular ingestion
//!
//! Rows with arbitrary column names become a store through a
//! [`ColumnMapping`] naming the seqname, start, end (or width) and strand
//! columns. Every unmapped column becomes an attribute.

use crate::core::io::open_reader;
use crate::core::{
    Interval, IntervalStore, RangesError, Result, Strand, Table, Value, CORE_COLUMNS,
};
use std::path::Path;

/// Maps caller column names onto the canonical interval fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub seqname: String,
    pub start: String,
    /// Column holding the closed end; takes precedence over `width`
    pub end: Option<String>,
    pub width: Option<String>,
    /// Strand column; rows are unstranded when absent
    pub strand: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            seqname: "seqname".to_string(),
            start: "start".to_string(),
            end: Some("end".to_string()),
            width: Some("width".to_string()),
            strand: Some("strand".to_string()),
        }
    }
}

impl ColumnMapping {
    /// Mapping with explicit seqname/start/end columns and no strand
    pub fn new(seqname: &str, start: &str, end: &str) -> Self {
        Self {
            seqname: seqname.to_string(),
            start: start.to_string(),
            end: Some(end.to_string()),
            width: None,
            strand: None,
        }
    }

    /// Derive the end from a width column instead
    pub fn with_width(mut self, width: &str) -> Self {
        self.end = None;
        self.width = Some(width.to_string());
        self
    }

    pub fn with_strand(mut self, strand: &str) -> Self {
        self.strand = Some(strand.to_string());
        self
    }
}

enum Extent {
    End(usize),
    Width(usize),
}

/// Column positions resolved against a header
struct Resolved {
    seqname: usize,
    start: usize,
    extent: Extent,
    strand: Option<usize>,
    /// (position, name) of attribute columns
    attrs: Vec<(usize, String)>,
}

impl ColumnMapping {
    fn resolve(&self, columns: &[String]) -> Result<Resolved> {
        let find = |name: &str| columns.iter().position(|c| c == name);
        let require =
            |name: &str| find(name).ok_or_else(|| RangesError::unknown_column(name, columns));

        let seqname = require(&self.seqname)?;
        let start = require(&self.start)?;
        let end = self.end.as_deref().and_then(find);
        let width = self.width.as_deref().and_then(find);
        let extent = match (end, width) {
            (Some(e), _) => Extent::End(e),
            (None, Some(w)) => Extent::Width(w),
            (None, None) => {
                let name = self.end.as_deref().or(self.width.as_deref()).unwrap_or("end");
                return Err(RangesError::unknown_column(name, columns));
            }
        };
        let strand = self.strand.as_deref().and_then(find);

        // Mapped columns and derived core columns are consumed
        let consumed = [Some(seqname), Some(start), end, width, strand];
        let attrs = columns
            .iter()
            .enumerate()
            .filter(|(i, name)| {
                !consumed.contains(&Some(*i)) && !CORE_COLUMNS.contains(&name.as_str())
            })
            .map(|(i, name)| (i, name.clone()))
            .collect();

        Ok(Resolved {
            seqname,
            start,
            extent,
            strand,
            attrs,
        })
    }
}

fn coordinate(value: &Value, column: &str) -> Result<i64> {
    value.as_i64().ok_or_else(|| {
        RangesError::TypeMismatch(format!(
            "column '{}' must hold integers, found {} '{}'",
            column,
            value.type_name(),
            value
        ))
    })
}

impl Resolved {
    fn interval(&self, columns: &[String], row: &[Value]) -> Result<Interval> {
        let seqname = match &row[self.seqname] {
            Value::Missing => {
                return Err(RangesError::TypeMismatch(format!(
                    "missing value in sequence column '{}'",
                    columns[self.seqname]
                )))
            }
            v => v.to_string(),
        };
        let start = coordinate(&row[self.start], &columns[self.start])?;
        let end = match self.extent {
            Extent::End(i) => coordinate(&row[i], &columns[i])?,
            Extent::Width(i) => start + coordinate(&row[i], &columns[i])? - 1,
        };
        let strand = match self.strand.map(|i| &row[i]) {
            None | Some(Value::Missing) => Strand::Unstranded,
            Some(v) => {
                let text = v.to_string();
                Strand::parse(&text).ok_or_else(|| {
                    RangesError::TypeMismatch(format!("invalid strand '{}'", text))
                })?
            }
        };
        let attrs = self.attrs.iter().map(|(i, _)| row[*i].clone()).collect();
        Interval::from_signed(seqname, start, end, strand, attrs)
    }
}

/// Build a store from rows of values
///
/// # Examples
/// ```
/// use tidyranges::core::Value;
/// use tidyranges::formats::{from_rows, ColumnMapping};
///
/// let columns = vec!["chrom".to_string(), "pos".to_string(), "len".to_string()];
/// let rows = vec![vec![Value::from("chr1"), Value::Int(100), Value::Int(10)]];
/// let mapping = ColumnMapping::new("chrom", "pos", "unused").with_width("len");
/// let store = from_rows(&columns, rows, &mapping).unwrap();
/// assert_eq!(store.get(0).unwrap().end(), 109);
/// ```
pub fn from_rows(
    columns: &[String],
    rows: Vec<Vec<Value>>,
    mapping: &ColumnMapping,
) -> Result<IntervalStore> {
    let resolved = mapping.resolve(columns)?;
    let mut intervals = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(RangesError::Parse {
                line: i + 1,
                message: format!("expected {} values, found {}", columns.len(), row.len()),
            });
        }
        intervals.push(resolved.interval(columns, row)?);
    }
    let schema = resolved.attrs.into_iter().map(|(_, name)| name).collect();
    IntervalStore::new(schema, intervals)
}

/// Re-ingest a summary table as intervals
pub fn from_table(table: &Table, mapping: &ColumnMapping) -> Result<IntervalStore> {
    from_rows(table.columns(), table.rows().to_vec(), mapping)
}

/// Read a delimited text file with a header line
///
/// Field types are inferred per cell: empty and `NA` are missing, then
/// integers, floats, `TRUE`/`FALSE`, and strings.
pub fn read_delimited(path: &Path, delimiter: u8, mapping: &ColumnMapping) -> Result<IntervalStore> {
    let reader = open_reader(path)?;
    let delimiter = char::from(delimiter);
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for (i, line) in std::io::BufRead::lines(reader).enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = line.split(delimiter);
        match &columns {
            None => columns = Some(fields.map(|f| f.trim().to_string()).collect()),
            Some(header) => {
                let row: Vec<Value> = fields.map(|f| Value::infer(f.trim())).collect();
                if row.len() != header.len() {
                    return Err(RangesError::Parse {
                        line: i + 1,
                        message: format!("expected {} fields, found {}", header.len(), row.len()),
                    });
                }
                rows.push(row);
            }
        }
    }

    let columns = columns.ok_or_else(|| RangesError::Parse {
        line: 0,
        message: "missing header line".to_string(),
    })?;
    log::info!("Read {} rows from {:?}", rows.len(), path);
    from_rows(&columns, rows, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_default_mapping() {
        let columns = names(&["seqname", "start", "end", "strand", "gene"]);
        let rows = vec![vec![
            Value::from("chr1"),
            Value::Int(10),
            Value::Int(20),
            Value::from("-"),
            Value::from("g1"),
        ]];
        let store = from_rows(&columns, rows, &ColumnMapping::default()).unwrap();
        let iv = store.get(0).unwrap();
        assert_eq!((iv.start(), iv.end(), iv.strand()), (10, 20, Strand::Minus));
        assert_eq!(store.schema(), &["gene".to_string()]);
    }

    #[test]
    fn test_width_column() {
        let columns = names(&["seqname", "start", "width"]);
        let rows = vec![vec![Value::from("chr1"), Value::Int(10), Value::Int(5)]];
        let store = from_rows(&columns, rows, &ColumnMapping::default()).unwrap();
        assert_eq!(store.get(0).unwrap().end(), 14);
        assert!(store.schema().is_empty());
    }

    #[test]
    fn test_missing_extent_is_schema_error() {
        let columns = names(&["seqname", "start", "score"]);
        let err = from_rows(&columns, Vec::new(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, RangesError::Schema { ref column, .. } if column == "end"));
    }

    #[test]
    fn test_unmapped_seqname() {
        let columns = names(&["chrom", "start", "end"]);
        let err = from_rows(&columns, Vec::new(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, RangesError::Schema { ref column, .. } if column == "seqname"));
    }

    #[test]
    fn test_invalid_coordinates() {
        let columns = names(&["seqname", "start", "end"]);
        let rows = vec![vec![Value::from("chr1"), Value::Int(20), Value::Int(10)]];
        let err = from_rows(&columns, rows, &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, RangesError::InvalidRange(_)));

        let rows = vec![vec![Value::from("chr1"), Value::from("x"), Value::Int(10)]];
        let err = from_rows(&columns, rows, &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, RangesError::TypeMismatch(_)));
    }

    #[test]
    fn test_from_table() {
        let table = Table::new(
            names(&["chrom", "from", "to", "n"]),
            vec![vec![Value::from("chr2"), Value::Int(1), Value::Int(9), Value::Int(3)]],
        );
        let store = from_table(&table, &ColumnMapping::new("chrom", "from", "to")).unwrap();
        assert_eq!(store.get(0).unwrap().width(), 9);
        assert_eq!(store.column("n").unwrap(), vec![Value::Int(3)]);
    }

    #[test]
    fn test_read_delimited() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chrom,pos,stop,strand,score,flag").unwrap();
        writeln!(file, "chr1,100,200,+,1.5,TRUE").unwrap();
        writeln!(file, "chr1,300,400,*,NA,FALSE").unwrap();
        file.flush().unwrap();

        let mapping = ColumnMapping::new("chrom", "pos", "stop").with_strand("strand");
        let store = read_delimited(file.path(), b',', &mapping).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.schema(), &names(&["score", "flag"]));
        assert_eq!(
            store.get(1).unwrap().attrs(),
            &[Value::Missing, Value::Bool(false)]
        );
        assert_eq!(store.get(0).unwrap().strand(), Strand::Plus);
    }

    #[test]
    fn test_read_delimited_ragged_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seqname\tstart\tend").unwrap();
        writeln!(file, "chr1\t1").unwrap();
        file.flush().unwrap();

        let err = read_delimited(file.path(), b'\t', &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, RangesError::Parse { line: 2, .. }));
    }
}
