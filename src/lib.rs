//! tidyranges - Genomic interval algebra
//!
//! Immutable interval stores with table-style verbs, overlap and
//! nearest-neighbour joins, and anchored coordinate arithmetic.
//!
//! # Features
//!
//! - 1-based closed coordinates with strand and typed attributes
//! - filter / mutate / select / arrange / group_by / summarise over an
//!   explicit expression tree
//! - Overlap joins (inner, left, intersect) and proximity joins (nearest,
//!   follow, precede) backed by a per-sequence interval index
//! - Parallel hit computation with rayon
//! - BED and delimited-table ingestion (gzip, bzip2)
//!
//! # Example
//!
//! ```
//! use tidyranges::core::expr::{col, lit};
//! use tidyranges::core::{join_overlap_inner, IntervalStore, JoinOptions, Strand, Value};
//!
//! let genes = IntervalStore::builder(&["gene"])
//!     .add("chr1", 100, 500, Strand::Plus, vec![Value::from("g1")])
//!     .build()
//!     .unwrap();
//! let peaks = IntervalStore::builder(&["score"])
//!     .add("chr1", 450, 600, Strand::Unstranded, vec![Value::Int(12)])
//!     .add("chr1", 900, 950, Strand::Unstranded, vec![Value::Int(3)])
//!     .build()
//!     .unwrap();
//!
//! let strong = peaks.filter([col("score").gt(lit(5))]).unwrap();
//! let joined = join_overlap_inner(&genes, &strong, &JoinOptions::default()).unwrap();
//! assert_eq!(joined.schema(), &["gene".to_string(), "score".to_string()]);
//! assert_eq!(joined.len(), 1);
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    Anchor, Expr, GenomeInfo, Hit, Interval, IntervalStore, JoinKind, JoinOptions, OverlapOptions,
    RangesError, Result, Strand, Table, Value,
};
pub use formats::{bed, ColumnMapping, RecordSource};
