//! Chromosome sizes files
//!
//! Two whitespace-separated columns per line: sequence name and length.
//! Extra columns (as in UCSC `chromInfo` dumps) are ignored.

use crate::core::io::open_reader;
use crate::core::{GenomeInfo, RangesError, Result};
use std::io::BufRead;
use std::path::Path;

/// Parse chromosome sizes from any buffered reader
pub fn parse_chrom_sizes<R: BufRead>(reader: R, genome_id: &str) -> Result<GenomeInfo> {
    let mut genome = GenomeInfo::new(genome_id);

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (name, length) = match (fields.next(), fields.next()) {
            (Some(name), Some(length)) => (name, length),
            _ => {
                return Err(RangesError::Parse {
                    line: i + 1,
                    message: "expected sequence name and length".to_string(),
                })
            }
        };
        let length: u64 = length.parse().map_err(|_| RangesError::Parse {
            line: i + 1,
            message: format!("invalid length '{}'", length),
        })?;

        if let Some(previous) = genome.seqlength(name) {
            if previous != length {
                return Err(RangesError::Parse {
                    line: i + 1,
                    message: format!(
                        "conflicting lengths for {}: {} and {}",
                        name, previous, length
                    ),
                });
            }
        }
        genome.seqlengths.insert(name.to_string(), length);
    }

    Ok(genome)
}

/// Read a chrom-sizes file; the genome id defaults to the file stem
pub fn read_chrom_sizes(path: &Path, genome_id: Option<&str>) -> Result<GenomeInfo> {
    let id = match genome_id {
        Some(id) => id.to_string(),
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.split('.').next().unwrap_or(n).to_string())
            .unwrap_or_default(),
    };
    let genome = parse_chrom_sizes(open_reader(path)?, &id)?;
    log::info!(
        "Loaded {} sequence lengths for genome '{}'",
        genome.seqlengths.len(),
        genome.genome_id
    );
    Ok(genome)
}
