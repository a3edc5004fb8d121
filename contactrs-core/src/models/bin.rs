use crate::errors::ConfigError;

///
/// One genomic bin with the covariates used for background modeling.
///
/// Bins are immutable once a [`BinTable`] is constructed; downstream
/// stages only read them.
///
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenomicBin {
    pub start: u32,
    pub end: u32,
    /// Fraction of G/C bases in the bin's sequence.
    pub gc: f64,
    /// Mean of a quantitative mappability track over the bin.
    /// `None` when no track was supplied.
    pub mappability: Option<f64>,
    /// Ligation-accessible length of the bin.
    pub effective_length: f64,
    /// Position within the chromosome's bin ordering.
    pub index: usize,
}

impl GenomicBin {
    pub fn width(&self) -> u32 {
        self.end - self.start
    }
}

///
/// The ordered bin set of one chromosome, together with a schema label
/// identifying the binning scheme and resolution it was built with.
///
/// Two samples can only be compared when their bin tables carry the same
/// schema.
///
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinTable {
    chrom: String,
    schema: String,
    bins: Vec<GenomicBin>,
}

impl BinTable {
    ///
    /// Create a new [BinTable] from bins in ascending genomic order.
    ///
    /// Bin indices are normalized to their position in the table.
    /// Fails if bins are unsorted or overlapping.
    ///
    pub fn new(
        chrom: impl Into<String>,
        schema: impl Into<String>,
        mut bins: Vec<GenomicBin>,
    ) -> Result<Self, ConfigError> {
        for k in 0..bins.len() {
            if bins[k].end <= bins[k].start {
                return Err(ConfigError::UnsortedBins(k));
            }
            if k > 0 && bins[k].start < bins[k - 1].end {
                return Err(ConfigError::UnsortedBins(k));
            }
            bins[k].index = k;
        }
        Ok(BinTable {
            chrom: chrom.into(),
            schema: schema.into(),
            bins,
        })
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn bins(&self) -> &[GenomicBin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Find the bin anchored at exactly `start`.
    pub fn index_of_start(&self, start: u32) -> Option<usize> {
        self.bins.binary_search_by_key(&start, |b| b.start).ok()
    }

    /// Smallest start-to-start gap between adjacent bins. `None` for
    /// tables with fewer than two bins.
    pub fn min_start_gap(&self) -> Option<u32> {
        self.bins
            .windows(2)
            .map(|w| w[1].start - w[0].start)
            .min()
    }

    /// Whether every bin carries a mappability value.
    pub fn has_mappability(&self) -> bool {
        !self.bins.is_empty() && self.bins.iter().all(|b| b.mappability.is_some())
    }
}
