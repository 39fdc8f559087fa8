//! Plain tabular result of `summarise`
//!
//! Rows of a table no longer denote single genomic loci, so a table is not
//! an interval store. Re-ingest it through
//! [`formats::table`](crate::formats::table) with an explicit column mapping.

use crate::core::error::{RangesError, Result};
use crate::core::Value;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let pos = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| RangesError::unknown_column(name, &self.columns))?;
        Ok(self.rows.iter().map(|r| &r[pos]).collect())
    }

    /// Single cell by row and column name
    pub fn get(&self, row: usize, name: &str) -> Result<&Value> {
        let pos = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| RangesError::unknown_column(name, &self.columns))?;
        self.rows
            .get(row)
            .map(|r| &r[pos])
            .ok_or_else(|| RangesError::InvalidRange(format!("row {} out of bounds", row)))
    }

    /// Write as tab-separated text with a header line
    pub fn write_tsv<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{}", self.columns.join("\t"))?;
        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", fields.join("\t"))?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buf = Vec::new();
        self.write_tsv(&mut buf).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", String::from_utf8_lossy(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["gene".to_string(), "n".to_string()],
            vec![
                vec![Value::from("a"), Value::Int(2)],
                vec![Value::from("b"), Value::Int(1)],
            ],
        )
    }

    #[test]
    fn test_column_lookup() {
        let t = table();
        assert_eq!(t.column("n").unwrap(), vec![&Value::Int(2), &Value::Int(1)]);
        assert!(t.column("score").is_err());
        assert_eq!(t.get(1, "gene").unwrap(), &Value::from("b"));
    }

    #[test]
    fn test_write_tsv() {
        let mut out = Vec::new();
        table().write_tsv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "gene\tn\na\t2\nb\t1\n");
    }
}
