//! Genome build metadata
//!
//! An optional `(genome_id, seqname -> length)` pair attached to a store.

use crate::core::error::{RangesError, Result};
use crate::core::Interval;
use std::collections::HashMap;

/// Genome build identifier and sequence lengths
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenomeInfo {
    /// Build name, e.g. "hg38"
    pub genome_id: String,
    /// Sequence name -> length in bases
    pub seqlengths: HashMap<String, u64>,
}

impl GenomeInfo {
    pub fn new(genome_id: impl Into<String>) -> Self {
        Self {
            genome_id: genome_id.into(),
            seqlengths: HashMap::new(),
        }
    }

    /// Add a sequence length (builder style)
    pub fn with_seq(mut self, seqname: impl Into<String>, length: u64) -> Self {
        self.seqlengths.insert(seqname.into(), length);
        self
    }

    pub fn seqlength(&self, seqname: &str) -> Option<u64> {
        self.seqlengths.get(seqname).copied()
    }

    /// Check that an interval lies on a known sequence and within its length
    pub fn validate(&self, iv: &Interval) -> Result<()> {
        match self.seqlength(iv.seqname()) {
            None => Err(RangesError::GenomeMismatch(format!(
                "sequence '{}' is not part of genome '{}'",
                iv.seqname(),
                self.genome_id
            ))),
            Some(len) if iv.end() > len => Err(RangesError::InvalidRange(format!(
                "{} extends past the end of {} (length {})",
                iv,
                iv.seqname(),
                len
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Two genomes are compatible when the ids match and no shared
    /// sequence has conflicting lengths
    ///
    /// # Examples
    /// ```
    /// use tidyranges::core::GenomeInfo;
    /// let a = GenomeInfo::new("hg38").with_seq("chr1", 248956422);
    /// let b = GenomeInfo::new("hg38").with_seq("chr2", 242193529);
    /// let c = GenomeInfo::new("hg19").with_seq("chr1", 249250621);
    /// assert!(a.check_compatible(&b).is_ok());
    /// assert!(a.check_compatible(&c).is_err());
    /// ```
    pub fn check_compatible(&self, other: &GenomeInfo) -> Result<()> {
        if self.genome_id != other.genome_id {
            return Err(RangesError::GenomeMismatch(format!(
                "'{}' vs '{}'",
                self.genome_id, other.genome_id
            )));
        }
        for (seq, len) in &self.seqlengths {
            if let Some(other_len) = other.seqlengths.get(seq) {
                if other_len != len {
                    return Err(RangesError::GenomeMismatch(format!(
                        "{} has length {} in one store and {} in the other",
                        seq, len, other_len
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Check genome metadata of two stores used together; stores without
/// metadata are compatible with anything
pub fn check_genomes(a: Option<&GenomeInfo>, b: Option<&GenomeInfo>) -> Result<()> {
    match (a, b) {
        (Some(a), Some(b)) => a.check_compatible(b),
        _ => Ok(()),
    }
}
