//! Error types for tidyranges
//!
//! Every verb fails locally and synchronously: an `Err` is returned from the
//! call that triggered it and no partially transformed store escapes.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for interval operations
#[derive(Debug, Error)]
pub enum RangesError {
    /// Malformed coordinates (width < 1, start < 1, end < start)
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Aggregate or grouping construct used where no group context exists
    #[error("Invalid context: {0}")]
    InvalidContext(String),

    /// Two stores carry incompatible genome metadata
    #[error("Genome mismatch: {0}")]
    GenomeMismatch(String),

    /// Reference to a column that does not exist
    #[error("Unknown column '{column}'{}", available_hint(.available))]
    Schema {
        column: String,
        available: Vec<String>,
    },

    /// Operator applied to values of incompatible types
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Malformed input line during ingestion
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Input file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn available_hint(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(" (available: {})", available.join(", "))
    }
}

impl RangesError {
    /// Build an `InvalidRange` error for a start/end pair
    pub fn range(start: i64, end: i64) -> Self {
        RangesError::InvalidRange(format!(
            "start={} end={} (width={})",
            start,
            end,
            end - start + 1
        ))
    }

    /// Build a `Schema` error listing the columns that do exist
    pub fn unknown_column<S: AsRef<str>>(column: &str, available: &[S]) -> Self {
        RangesError::Schema {
            column: column.to_string(),
            available: available.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

/// Result type alias for interval operations
pub type Result<T> = std::result::Result<T, RangesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_columns() {
        let err = RangesError::unknown_column("gc", &["score", "name"]);
        let msg = err.to_string();
        assert!(msg.contains("'gc'"));
        assert!(msg.contains("score, name"));
    }

    #[test]
    fn test_schema_error_without_columns() {
        let err = RangesError::unknown_column::<&str>("gc", &[]);
        assert_eq!(err.to_string(), "Unknown column 'gc'");
    }

    #[test]
    fn test_range_error_reports_width() {
        let err = RangesError::range(100, 90);
        assert!(err.to_string().contains("width=-9"));
    }
}
