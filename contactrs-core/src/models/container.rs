use std::collections::{BTreeMap, HashMap};

use crate::errors::ConfigError;
use crate::models::bin::BinTable;
use crate::models::record::{CountRecord, InteractionRecord};

///
/// Counts of matched and dropped rows from one ingestion pass.
///
/// Source pairs whose anchors are outside the container's bin set, on a
/// different chromosome, or beyond the modeled distance range are dropped
/// silently; callers that care can inspect the drop count.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub ingested: usize,
    pub dropped: usize,
}

///
/// The sparse interaction table of one chromosome.
///
/// Holds the chromosome's [BinTable], all bin pairs within the distance
/// cutoff (sorted by `(start_i, start_j)`, no duplicates), and the 2-D
/// covariate columns attached by feature expansion. Covariates are stored
/// columnar: one `Vec<f64>` per name, parallel to the record vector.
///
/// Containers are created once per chromosome and passed by value through
/// the pipeline stages; they are only ever replaced wholesale, never
/// partially deleted.
///
#[derive(Debug, Clone)]
pub struct InteractionContainer {
    bins: BinTable,
    max_distance: u32,
    records: Vec<InteractionRecord>,
    covariates: BTreeMap<String, Vec<f64>>,
    index: HashMap<(u32, u32), usize>,
}

impl PartialEq for InteractionContainer {
    fn eq(&self, other: &Self) -> bool {
        // the position index is derived state
        self.bins == other.bins
            && self.max_distance == other.max_distance
            && self.records == other.records
            && self.covariates == other.covariates
    }
}

impl InteractionContainer {
    ///
    /// Enumerate all bin pairs (i, j) with j > i and
    /// `start_j - start_i <= max_distance`, each starting with count 0.
    ///
    /// The scan walks a sorted window per bin, so the cost is
    /// O(bins x average window size) rather than quadratic in the
    /// chromosome length.
    ///
    pub fn build(bins: BinTable, max_distance: u32) -> Result<Self, ConfigError> {
        if let Some(gap) = bins.min_start_gap() {
            if max_distance < gap {
                return Err(ConfigError::MaxDistanceBelowBinSize {
                    max_distance,
                    bin_size: gap,
                });
            }
        }

        let starts: Vec<u32> = bins.bins().iter().map(|b| b.start).collect();
        let mut records = Vec::new();
        for i in 0..starts.len() {
            for j in (i + 1)..starts.len() {
                if starts[j] - starts[i] > max_distance {
                    break;
                }
                records.push(InteractionRecord::new(starts[i], starts[j]));
            }
        }

        let index = records
            .iter()
            .enumerate()
            .map(|(pos, r)| ((r.start_i, r.start_j), pos))
            .collect();

        Ok(InteractionContainer {
            bins,
            max_distance,
            records,
            covariates: BTreeMap::new(),
            index,
        })
    }

    ///
    /// Reassemble a container from previously serialized parts.
    ///
    /// Records are re-sorted into anchor order; covariate columns must
    /// match the record count.
    ///
    pub fn from_parts(
        bins: BinTable,
        max_distance: u32,
        records: Vec<InteractionRecord>,
        mut covariates: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, ConfigError> {
        for (name, column) in &covariates {
            if column.len() != records.len() {
                return Err(ConfigError::CovariateLengthMismatch {
                    name: name.clone(),
                    got: column.len(),
                    expected: records.len(),
                });
            }
        }

        // sort records and covariate columns through one permutation
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by_key(|&i| (records[i].start_i, records[i].start_j));
        let records: Vec<InteractionRecord> =
            order.iter().map(|&i| records[i].clone()).collect();
        for column in covariates.values_mut() {
            *column = order.iter().map(|&i| column[i]).collect();
        }

        for pair in records.windows(2) {
            if (pair[0].start_i, pair[0].start_j) == (pair[1].start_i, pair[1].start_j) {
                return Err(ConfigError::DuplicateRecord(pair[0].start_i, pair[0].start_j));
            }
        }
        for record in &records {
            for anchor in [record.start_i, record.start_j] {
                if bins.index_of_start(anchor).is_none() {
                    return Err(ConfigError::UnknownAnchor(anchor));
                }
            }
        }
        let index = records
            .iter()
            .enumerate()
            .map(|(pos, r)| ((r.start_i, r.start_j), pos))
            .collect();
        Ok(InteractionContainer {
            bins,
            max_distance,
            records,
            covariates,
            index,
        })
    }

    pub fn chrom(&self) -> &str {
        self.bins.chrom()
    }

    pub fn bins(&self) -> &BinTable {
        &self.bins
    }

    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    pub fn records(&self) -> &[InteractionRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [InteractionRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, start_i: u32, start_j: u32) -> Option<&InteractionRecord> {
        self.index
            .get(&(start_i, start_j))
            .map(|&pos| &self.records[pos])
    }

    pub fn position(&self, start_i: u32, start_j: u32) -> Option<usize> {
        self.index.get(&(start_i, start_j)).copied()
    }

    ///
    /// Ingest counts from a raw source stream.
    ///
    /// Tolerates arbitrary row order and duplicate keys: re-ingesting a
    /// pair overwrites its count (last write wins), so ingestion is
    /// idempotent per pair. Unmatched pairs are dropped, not an error --
    /// counts beyond the modeled distance range are expected in real
    /// sources.
    ///
    pub fn add_counts<I>(&mut self, source: I) -> IngestStats
    where
        I: IntoIterator<Item = CountRecord>,
    {
        let mut stats = IngestStats::default();
        for row in source {
            if row.chrom != self.chrom() {
                stats.dropped += 1;
                continue;
            }
            let (a, b) = if row.start_i <= row.start_j {
                (row.start_i, row.start_j)
            } else {
                (row.start_j, row.start_i)
            };
            match self.index.get(&(a, b)) {
                Some(&pos) => {
                    self.records[pos].count = row.count;
                    stats.ingested += 1;
                }
                None => stats.dropped += 1,
            }
        }
        stats
    }

    /// Attach (or overwrite) a named covariate column.
    pub fn set_covariate(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if values.len() != self.records.len() {
            return Err(ConfigError::CovariateLengthMismatch {
                name,
                got: values.len(),
                expected: self.records.len(),
            });
        }
        self.covariates.insert(name, values);
        Ok(())
    }

    pub fn covariate(&self, name: &str) -> Option<&[f64]> {
        self.covariates.get(name).map(|v| v.as_slice())
    }

    pub fn covariate_names(&self) -> impl Iterator<Item = &str> {
        self.covariates.keys().map(|s| s.as_str())
    }

    pub fn covariates(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.covariates
    }

    /// The named covariates of one record, in column-name order.
    pub fn record_covariates(&self, pos: usize) -> Vec<(&str, f64)> {
        self.covariates
            .iter()
            .map(|(name, column)| (name.as_str(), column[pos]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bin::GenomicBin;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn bin(start: u32, end: u32) -> GenomicBin {
        GenomicBin {
            start,
            end,
            gc: 0.4,
            mappability: None,
            effective_length: (end - start) as f64,
            index: 0,
        }
    }

    fn chr9_table() -> BinTable {
        BinTable::new(
            "chr9",
            "fragments:1:500",
            vec![
                bin(1, 300),
                bin(300, 7867),
                bin(7867, 103938),
                bin(103938, 110000),
            ],
        )
        .unwrap()
    }

    #[rstest]
    fn test_build_enumerates_all_pairs_within_cutoff() {
        let container = InteractionContainer::build(chr9_table(), 500_000).unwrap();

        let pairs: Vec<(u32, u32)> = container
            .records()
            .iter()
            .map(|r| (r.start_i, r.start_j))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (1, 300),
                (1, 7867),
                (1, 103938),
                (300, 7867),
                (300, 103938),
                (7867, 103938),
            ]
        );
        for record in container.records() {
            assert!(record.start_i <= record.start_j);
            assert!(record.distance() <= 500_000);
            assert_eq!(record.count, 0);
        }
    }

    #[rstest]
    fn test_build_respects_distance_cutoff() {
        let container = InteractionContainer::build(chr9_table(), 8_000).unwrap();
        let pairs: Vec<(u32, u32)> = container
            .records()
            .iter()
            .map(|r| (r.start_i, r.start_j))
            .collect();
        assert_eq!(pairs, vec![(1, 300), (1, 7867), (300, 7867)]);
    }

    #[rstest]
    fn test_build_rejects_cutoff_below_bin_size() {
        let table = BinTable::new(
            "chr1",
            "uniform:1000",
            vec![bin(0, 1000), bin(1000, 2000), bin(2000, 3000)],
        )
        .unwrap();
        let result = InteractionContainer::build(table, 999);
        assert!(matches!(
            result,
            Err(ConfigError::MaxDistanceBelowBinSize { .. })
        ));
    }

    #[rstest]
    fn test_add_counts_last_write_wins() {
        let mut container = InteractionContainer::build(chr9_table(), 500_000).unwrap();

        let rows = vec![
            CountRecord {
                chrom: "chr9".into(),
                start_i: 300,
                start_j: 7867,
                count: 5,
            },
            // swapped anchors still match the sorted record
            CountRecord {
                chrom: "chr9".into(),
                start_i: 7867,
                start_j: 300,
                count: 9,
            },
        ];
        let stats = container.add_counts(rows);
        assert_eq!(stats.ingested, 2);
        assert_eq!(container.get(300, 7867).unwrap().count, 9);
    }

    #[rstest]
    fn test_add_counts_drops_unmatched() {
        let mut container = InteractionContainer::build(chr9_table(), 500_000).unwrap();

        let rows = vec![
            CountRecord {
                chrom: "chr2".into(),
                start_i: 1,
                start_j: 300,
                count: 3,
            },
            CountRecord {
                chrom: "chr9".into(),
                start_i: 1,
                start_j: 999_999,
                count: 4,
            },
        ];
        let stats = container.add_counts(rows);
        assert_eq!(stats, IngestStats { ingested: 0, dropped: 2 });
    }

    #[rstest]
    fn test_covariate_length_checked() {
        let mut container = InteractionContainer::build(chr9_table(), 500_000).unwrap();
        let result = container.set_covariate("gc", vec![0.5; 3]);
        assert!(matches!(
            result,
            Err(ConfigError::CovariateLengthMismatch { .. })
        ));
    }

    #[rstest]
    fn test_from_parts_rejects_duplicate_pairs() {
        let container = InteractionContainer::build(chr9_table(), 500_000).unwrap();
        let mut records = container.records().to_vec();
        records.push(records[0].clone());

        let result = InteractionContainer::from_parts(
            container.bins().clone(),
            container.max_distance(),
            records,
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(ConfigError::DuplicateRecord(1, 300))));
    }

    #[rstest]
    fn test_from_parts_round_trips_equality() {
        let mut container = InteractionContainer::build(chr9_table(), 500_000).unwrap();
        container
            .set_covariate("gc", vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6])
            .unwrap();

        let rebuilt = InteractionContainer::from_parts(
            container.bins().clone(),
            container.max_distance(),
            container.records().to_vec(),
            container.covariates().clone(),
        )
        .unwrap();
        assert_eq!(container, rebuilt);
    }
}
