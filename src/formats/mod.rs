//! File format adapters
//!
//! Adapters that turn external records into interval stores (BED, delimited
//! tables, chromosome sizes) and write stores back out.

pub mod bed;
pub mod genome;
pub mod source;
pub mod table;

pub use bed::{read_bed, write_bed, write_bed_path, BedParseError, BedReader, BedRecordView, ReadStats};
pub use genome::{parse_chrom_sizes, read_chrom_sizes};
pub use source::{RecordSource, VecSource};
pub use table::{from_rows, from_table, read_delimited, ColumnMapping};
