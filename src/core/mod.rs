//! Core interval algebra
//!
//! This module contains the interval model, the interval store and its
//! verbs, the per-sequence index, the join engine and anchored
//! coordinate arithmetic.

mod arith;
mod error;
pub mod expr;
mod genome;
mod index;
mod interval;
pub mod io;
mod join;
mod store;
mod strand;
mod table;
mod value;

pub use arith::{flank, resize, shift, stretch, Anchor};
pub use error::{RangesError, Result};
pub use expr::{Expr, Frame, RowView};
pub use genome::{check_genomes, GenomeInfo};
pub use index::{IndexEntry, StoreIndex};
pub use interval::Interval;
pub use io::{
    detect_compression, open_reader, open_writer, ByteLineIterator, CompressionFormat,
    OutputFile, DEFAULT_BUFFER_SIZE,
};
pub use join::{
    count_overlaps, find_nearest, find_overlaps, join, join_follow, join_nearest,
    join_overlap_inner, join_overlap_intersect, join_overlap_left, join_precede, Hit, JoinKind,
    JoinOptions, OverlapOptions, Proximity,
};
pub use store::{asc, desc, IntervalStore, SortKey, StoreBuilder, CORE_COLUMNS};
pub use strand::Strand;
pub use table::Table;
pub use value::Value;
