use thiserror::Error;

/// Invalid parameters. Raised before any work begins; always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Bin size must be positive")]
    NonPositiveBinSize,

    #[error("Fragment group size must be positive")]
    NonPositiveGroupSize,

    #[error("Cutsite positions must be sorted in ascending order")]
    UnsortedCutsites,

    #[error("Bins must be sorted and non-overlapping (offending bin index: {0})")]
    UnsortedBins(usize),

    #[error(
        "Maximum distance {max_distance} is smaller than the bin size {bin_size}: no valid pairs"
    )]
    MaxDistanceBelowBinSize { max_distance: u32, bin_size: u32 },

    #[error("Covariate column '{name}' has {got} values, expected {expected}")]
    CovariateLengthMismatch {
        name: String,
        got: usize,
        expected: usize,
    },

    #[error("Missing covariate column '{0}': run feature expansion first")]
    MissingCovariate(String),

    #[error("Record anchor {0} does not match any bin start")]
    UnknownAnchor(u32),

    #[error("Duplicate interaction record ({0}, {1})")]
    DuplicateRecord(u32, u32),

    #[error("Duplicate chromosome in sample: {0}")]
    DuplicateChromosome(String),

    #[error("Binning schema mismatch: '{0}' vs '{1}'")]
    SchemaMismatch(String, String),

    #[error("At least two conditions are required, got {0}")]
    TooFewConditions(usize),

    #[error("Condition '{0}' has no replicate samples")]
    NoReplicates(String),

    #[error("Reference condition '{0}' not found among supplied conditions")]
    UnknownReference(String),

    #[error("Filter set is empty after intersecting with available records")]
    EmptyFilterSet,

    #[error("Distance bin count must be positive")]
    NoDistanceBins,

    #[error("Spline degrees of freedom must be positive")]
    NonPositiveSplineDf,

    #[error("Downsample fraction must be in (0, 1], got {0}")]
    InvalidDownsampleFraction(f64),
}

/// Malformed or missing input data. Fatal for the affected
/// chromosome/record, but siblings keep going when run in parallel.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No sequence available for chromosome: {0}")]
    MissingSequence(String),

    #[error("Invalid range {start}..{end} on chromosome {chrom} (length {len})")]
    InvalidRange {
        chrom: String,
        start: u32,
        end: u32,
        len: usize,
    },

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
