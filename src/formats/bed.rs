//! BED format adapter
//!
//! Reads BED3 through BED6 plus any extra columns, converting the on-disk
//! 0-based half-open coordinates to 1-based closed. Plain, gzip and bzip2
//! inputs are detected automatically.

use crate::core::io::{open_reader, open_writer, ByteLineIterator};
use crate::core::{Interval, IntervalStore, RangesError, Result, Strand, Value};
use crate::formats::source::RecordSource;
use memchr::memchr;
use std::io::{BufRead, Write};
use std::path::Path;

/// Zero-copy BED record view for parsing
/// Only parses coordinate fields immediately, other fields are kept as byte slices
pub struct BedRecordView<'a> {
    /// Original line bytes
    line: &'a [u8],
    /// Chromosome name
    pub chrom: &'a str,
    /// Start position (0-based)
    pub start: u64,
    /// End position (exclusive)
    pub end: u64,
    /// Field boundaries (start, end) for lazy access
    field_bounds: Vec<(usize, usize)>,
}

impl<'a> BedRecordView<'a> {
    /// Parse a BED line with minimal allocation
    pub fn parse(line: &'a [u8]) -> std::result::Result<Self, BedParseError> {
        if line.is_empty() {
            return Err(BedParseError::EmptyLine);
        }

        // Find field boundaries using memchr for tab characters
        let mut field_bounds = Vec::with_capacity(12);
        let mut start_pos = 0;
        while let Some(tab_pos) = memchr(b'\t', &line[start_pos..]) {
            let end_pos = start_pos + tab_pos;
            field_bounds.push((start_pos, end_pos));
            start_pos = end_pos + 1;
        }
        field_bounds.push((start_pos, line.len()));

        // Need at least 3 fields (BED3)
        if field_bounds.len() < 3 {
            return Err(BedParseError::TooFewFields {
                expected: 3,
                found: field_bounds.len(),
            });
        }

        let field_str = |i: usize, name: &'static str| {
            let (s, e) = field_bounds[i];
            std::str::from_utf8(&line[s..e]).map_err(|_| BedParseError::InvalidUtf8(name))
        };

        let chrom = field_str(0, "chrom")?;
        let start_str = field_str(1, "start")?;
        let start: u64 = start_str
            .parse()
            .map_err(|_| BedParseError::InvalidNumber("start", start_str.to_string()))?;
        let end_str = field_str(2, "end")?;
        let end: u64 = end_str
            .parse()
            .map_err(|_| BedParseError::InvalidNumber("end", end_str.to_string()))?;

        if end <= start {
            return Err(BedParseError::EmptyRange { start, end });
        }

        Ok(Self {
            line,
            chrom,
            start,
            end,
            field_bounds,
        })
    }

    /// Get the number of fields
    pub fn field_count(&self) -> usize {
        self.field_bounds.len()
    }

    /// Get field as string slice (lazy access)
    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.field_bounds
            .get(index)
            .and_then(|(start, end)| std::str::from_utf8(&self.line[*start..*end]).ok())
    }

    /// Get name field (field 3) if present
    pub fn name(&self) -> Option<&'a str> {
        self.field(3)
    }

    /// Get score field (field 4) if present
    pub fn score(&self) -> Option<&'a str> {
        self.field(4)
    }

    /// Get strand field (field 5); `.` and absent fields are unstranded
    pub fn strand(&self) -> Strand {
        self.field(5).and_then(Strand::parse).unwrap_or_default()
    }

    /// Convert to a 1-based closed interval with attributes for `n_attrs` columns
    fn to_interval(&self, n_attrs: usize) -> Result<Interval> {
        let mut attrs = Vec::with_capacity(n_attrs);
        for i in 0..n_attrs {
            // name, score, then everything after the strand column
            let field = if i < 2 { i + 3 } else { i + 4 };
            let value = match self.field(field) {
                Some(".") | None => Value::Missing,
                Some(s) if field == 3 => Value::Str(s.to_string()),
                Some(s) => Value::infer(s),
            };
            attrs.push(value);
        }
        Interval::new(self.chrom, self.start + 1, self.end, self.strand())
            .map(|iv| iv.with_attrs(attrs))
    }
}

/// BED parsing error
#[derive(Debug, thiserror::Error)]
pub enum BedParseError {
    #[error("Empty line")]
    EmptyLine,

    #[error("Too few fields: expected at least {expected}, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("Invalid UTF-8 in field: {0}")]
    InvalidUtf8(&'static str),

    #[error("Invalid number in field {0}: {1}")]
    InvalidNumber(&'static str, String),

    #[error("Empty range: start={start} end={end}")]
    EmptyRange { start: u64, end: u64 },
}

/// Attribute column names for a BED line with `fields` columns
fn bed_schema(fields: usize) -> Vec<String> {
    let mut schema = Vec::new();
    if fields >= 4 {
        schema.push("name".to_string());
    }
    if fields >= 5 {
        schema.push("score".to_string());
    }
    // Extra columns are named after their 1-based position
    for i in 7..=fields {
        schema.push(format!("V{}", i));
    }
    schema
}

fn is_header(line: &[u8]) -> bool {
    line.is_empty()
        || line[0] == b'#'
        || line.starts_with(b"track")
        || line.starts_with(b"browser")
}

/// Reading statistics
#[derive(Debug, Default, Clone)]
pub struct ReadStats {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
}

/// Streaming BED reader
///
/// The column layout is taken from the first data line. Malformed lines
/// are skipped with a warning unless the reader is strict.
pub struct BedReader<R: BufRead> {
    lines: ByteLineIterator<R>,
    schema: Vec<String>,
    fields: usize,
    pending: Option<Result<Interval>>,
    strict: bool,
    stats: ReadStats,
}

impl BedReader<Box<dyn BufRead>> {
    /// Open a BED file, decompressing gzip or bzip2 input
    pub fn from_path(path: &Path) -> Result<Self> {
        log::info!("Reading BED file {:?}", path);
        Self::new(open_reader(path)?)
    }
}

impl<R: BufRead> BedReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Self::with_strict(reader, false)
    }

    /// Reader that fails on the first malformed line
    pub fn strict(reader: R) -> Result<Self> {
        Self::with_strict(reader, true)
    }

    fn with_strict(reader: R, strict: bool) -> Result<Self> {
        let mut this = Self {
            lines: ByteLineIterator::new(reader),
            schema: Vec::new(),
            fields: 3,
            pending: None,
            strict,
            stats: ReadStats::default(),
        };
        // Look ahead to the first parseable line to fix the schema
        loop {
            let line_number = this.lines.line_number() + 1;
            let line = match this.lines.next_line() {
                None => break,
                Some(line) => line?,
            };
            if is_header(line) {
                continue;
            }
            this.stats.total += 1;
            match BedRecordView::parse(line) {
                Ok(view) => {
                    this.fields = view.field_count();
                    this.schema = bed_schema(this.fields);
                    this.pending = Some(view.to_interval(this.schema.len()));
                    this.stats.success += 1;
                    break;
                }
                Err(e) => {
                    if strict {
                        return Err(RangesError::Parse {
                            line: line_number,
                            message: e.to_string(),
                        });
                    }
                    log::warn!("Skipping BED line {}: {}", line_number, e);
                    this.stats.skipped += 1;
                }
            }
        }
        Ok(this)
    }

    /// Counts of lines seen so far
    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }
}

impl<R: BufRead> RecordSource for BedReader<R> {
    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn next_record(&mut self) -> Option<Result<Interval>> {
        if let Some(first) = self.pending.take() {
            return Some(first);
        }
        loop {
            let line_number = self.lines.line_number() + 1;
            let line = match self.lines.next_line()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if is_header(line) {
                continue;
            }
            self.stats.total += 1;

            let parsed = BedRecordView::parse(line).map_err(|e| e.to_string()).and_then(|view| {
                if view.field_count() != self.fields {
                    Err(format!(
                        "expected {} fields, found {}",
                        self.fields,
                        view.field_count()
                    ))
                } else {
                    Ok(view.to_interval(self.schema.len()))
                }
            });

            match parsed {
                Ok(iv) => {
                    self.stats.success += 1;
                    return Some(iv);
                }
                Err(message) if self.strict => {
                    return Some(Err(RangesError::Parse {
                        line: line_number,
                        message,
                    }));
                }
                Err(message) => {
                    log::warn!("Skipping BED line {}: {}", line_number, message);
                    self.stats.skipped += 1;
                }
            }
        }
    }
}

/// Read a whole BED file into a store, optionally keeping only records
/// that overlap `region`
pub fn read_bed(path: &Path, region: Option<&IntervalStore>) -> Result<IntervalStore> {
    let reader = BedReader::from_path(path)?;
    let store = reader.collect_store(region)?;
    log::info!("Loaded {} intervals from {:?}", store.len(), path);
    Ok(store)
}

fn bed_field(value: &Value) -> String {
    match value {
        Value::Missing => ".".to_string(),
        other => other.to_string(),
    }
}

/// Write a store as BED6 followed by the remaining attribute columns
///
/// `name` and `score` columns fill their BED slots when present.
pub fn write_bed<W: Write>(store: &IntervalStore, mut out: W) -> Result<()> {
    let name_pos = store.attr_position("name");
    let score_pos = store.attr_position("score");
    let extra: Vec<usize> = (0..store.schema().len())
        .filter(|&i| Some(i) != name_pos && Some(i) != score_pos)
        .collect();

    let mut line = String::with_capacity(256);
    for iv in store {
        line.clear();
        let attrs = iv.attrs();
        line.push_str(iv.seqname());
        line.push('\t');
        line.push_str(&(iv.start() - 1).to_string());
        line.push('\t');
        line.push_str(&iv.end().to_string());
        line.push('\t');
        line.push_str(&name_pos.map_or(".".to_string(), |p| bed_field(&attrs[p])));
        line.push('\t');
        line.push_str(&score_pos.map_or("0".to_string(), |p| bed_field(&attrs[p])));
        line.push('\t');
        line.push(match iv.strand() {
            Strand::Unstranded => '.',
            s => s.to_char(),
        });
        for &i in &extra {
            line.push('\t');
            line.push_str(&bed_field(&attrs[i]));
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// Write a store to a BED file, gzip-compressed when the path ends in `.gz`
pub fn write_bed_path(store: &IntervalStore, path: &Path) -> Result<()> {
    let mut out = open_writer(path)?;
    write_bed(store, &mut out)?;
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_str(text: &str) -> IntervalStore {
        BedReader::new(text.as_bytes())
            .unwrap()
            .collect_store(None)
            .unwrap()
    }

    #[test]
    fn test_bed_record_view_bed3() {
        let line = b"chr1\t1000\t2000";
        let view = BedRecordView::parse(line).unwrap();

        assert_eq!(view.chrom, "chr1");
        assert_eq!(view.start, 1000);
        assert_eq!(view.end, 2000);
        assert_eq!(view.field_count(), 3);
        assert_eq!(view.strand(), Strand::Unstranded);
    }

    #[test]
    fn test_bed_record_view_bed6() {
        let line = b"chr1\t1000\t2000\tgene1\t500\t-";
        let view = BedRecordView::parse(line).unwrap();

        assert_eq!(view.name(), Some("gene1"));
        assert_eq!(view.score(), Some("500"));
        assert_eq!(view.strand(), Strand::Minus);
    }

    #[test]
    fn test_bed_record_view_errors() {
        assert!(matches!(
            BedRecordView::parse(b"chr1\t1000"),
            Err(BedParseError::TooFewFields { .. })
        ));
        assert!(matches!(BedRecordView::parse(b""), Err(BedParseError::EmptyLine)));
        assert!(matches!(
            BedRecordView::parse(b"chr1\tabc\t2000"),
            Err(BedParseError::InvalidNumber(_, _))
        ));
        assert!(matches!(
            BedRecordView::parse(b"chr1\t10\t10"),
            Err(BedParseError::EmptyRange { .. })
        ));
    }

    #[test]
    fn test_zero_based_to_one_based() {
        let store = read_str("chr1\t0\t10\n");
        let iv = store.get(0).unwrap();
        assert_eq!((iv.start(), iv.end(), iv.width()), (1, 10, 10));
        assert!(store.schema().is_empty());
    }

    #[test]
    fn test_schema_from_first_line() {
        let store = read_str(
            "track name=test\n# comment\nchr1\t0\t10\tg1\t5\t+\t0.5\tx\nchr2\t5\t8\t.\t.\t.\tNA\ty\n",
        );
        assert_eq!(store.schema(), &["name", "score", "V7", "V8"]);
        assert_eq!(store.len(), 2);

        let second = store.get(1).unwrap();
        assert_eq!(second.strand(), Strand::Unstranded);
        assert_eq!(
            second.attrs(),
            &[Value::Missing, Value::Missing, Value::Missing, Value::from("y")]
        );
        assert_eq!(store.get(0).unwrap().attrs()[1], Value::Int(5));
        assert_eq!(store.get(0).unwrap().attrs()[2], Value::Float(0.5));
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let mut reader =
            BedReader::new("chr1\tx\t10\nchr1\t0\t10\nchr1\t5\nchr1\t20\t30\n".as_bytes()).unwrap();
        let mut n = 0;
        while let Some(record) = reader.next_record() {
            record.unwrap();
            n += 1;
        }
        assert_eq!(n, 2);
        assert_eq!(reader.stats().skipped, 2);
        assert_eq!(reader.stats().success, 2);
    }

    #[test]
    fn test_strict_reader_fails() {
        let mut reader = BedReader::strict("chr1\t0\t10\nchr1\t5\n".as_bytes()).unwrap();
        assert!(reader.next_record().unwrap().is_ok());
        let err = reader.next_record().unwrap().unwrap_err();
        assert!(matches!(err, RangesError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_write_bed() {
        let store = IntervalStore::builder(&["name", "extra"])
            .add("chr1", 1, 10, Strand::Plus, vec![Value::from("g1"), Value::Int(3)])
            .add("chr1", 20, 30, Strand::Unstranded, vec![Value::Missing, Value::Missing])
            .build()
            .unwrap();
        let mut out = Vec::new();
        write_bed(&store, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chr1\t0\t10\tg1\t0\t+\t3\nchr1\t19\t30\t.\t0\t.\t.\n"
        );
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.bed.gz");
        let store = IntervalStore::builder(&["name", "score"])
            .add("chr1", 101, 200, Strand::Minus, vec![Value::from("a"), Value::Int(7)])
            .build()
            .unwrap();

        write_bed_path(&store, &path).unwrap();
        let back = read_bed(&path, None).unwrap();
        assert_eq!(back, store);
    }
}
