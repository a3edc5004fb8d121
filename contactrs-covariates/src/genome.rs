use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use bio::io::fasta;

use contactrs_core::errors::DataError;

///
/// In-memory genome sequence provider, keyed by chromosome name.
///
pub struct GenomeAssembly {
    seq_map: HashMap<String, Vec<u8>>,
}

impl TryFrom<&str> for GenomeAssembly {
    type Error = DataError;

    fn try_from(value: &str) -> Result<Self, DataError> {
        GenomeAssembly::try_from(Path::new(value))
    }
}

impl TryFrom<&Path> for GenomeAssembly {
    type Error = DataError;

    ///
    /// Create a new [GenomeAssembly] from a fasta file
    ///
    fn try_from(value: &Path) -> Result<GenomeAssembly, DataError> {
        let file = File::open(value)?;
        let genome = fasta::Reader::new(file);

        let mut seq_map: HashMap<String, Vec<u8>> = HashMap::new();
        for (line, record) in genome.records().enumerate() {
            let record = record.map_err(|e| DataError::MalformedRow {
                line,
                reason: format!("Error reading genome file: {}", e),
            })?;
            seq_map.insert(record.id().to_string(), record.seq().to_owned());
        }

        Ok(GenomeAssembly { seq_map })
    }
}

impl GenomeAssembly {
    /// Build an assembly directly from named sequences.
    pub fn from_sequences<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        GenomeAssembly {
            seq_map: sequences
                .into_iter()
                .map(|(name, seq)| (name.into(), seq))
                .collect(),
        }
    }

    pub fn seq(&self, chrom: &str, start: u32, end: u32) -> Result<&[u8], DataError> {
        let seq = self
            .seq_map
            .get(chrom)
            .ok_or_else(|| DataError::MissingSequence(chrom.to_string()))?;

        let (start, end) = (start as usize, end as usize);
        if end <= seq.len() && start <= end {
            Ok(&seq[start..end])
        } else {
            Err(DataError::InvalidRange {
                chrom: chrom.to_string(),
                start: start as u32,
                end: end as u32,
                len: seq.len(),
            })
        }
    }

    pub fn chrom_len(&self, chrom: &str) -> Result<u32, DataError> {
        self.seq_map
            .get(chrom)
            .map(|s| s.len() as u32)
            .ok_or_else(|| DataError::MissingSequence(chrom.to_string()))
    }

    pub fn contains_chrom(&self, chrom: &str) -> bool {
        self.seq_map.contains_key(chrom)
    }
}

/// Fraction of G/C bases in `seq`, counting only unambiguous bases.
pub fn gc_fraction(seq: &[u8]) -> f64 {
    let mut gc_count: u32 = 0;
    let mut total_count: u32 = 0;
    for base in seq {
        match base.to_ascii_lowercase() {
            b'g' | b'c' => {
                gc_count += 1;
                total_count += 1;
            }
            b'a' | b't' => {
                total_count += 1;
            }
            _ => {}
        }
    }
    if total_count == 0 {
        0.0
    } else {
        gc_count as f64 / total_count as f64
    }
}

/// Number of masked (`N`/`n`) bases in `seq`.
pub fn masked_bases(seq: &[u8]) -> u32 {
    seq.iter()
        .filter(|b| matches!(b.to_ascii_lowercase(), b'n'))
        .count() as u32
}
