use contactrs_core::errors::ConfigError;
use contactrs_core::models::bin::{BinTable, GenomicBin};

use crate::errors::CovariateError;
use crate::genome::{GenomeAssembly, gc_fraction, masked_bases};
use crate::mappability::MappabilitySource;

///
/// How a chromosome is partitioned into bins.
///
#[derive(Debug, Clone)]
pub enum BinningScheme {
    /// Fixed-size windows tiling the chromosome.
    UniformWindows { size: u32 },
    /// Groups of consecutive restriction fragments. Cutsite positions are
    /// an input here; enumerating them from sequence motifs belongs to an
    /// upstream collaborator.
    FragmentGroups {
        cutsites: Vec<u32>,
        per_group: usize,
        /// Distance from a fragment boundary still considered
        /// ligation-accessible.
        boundary_margin: u32,
    },
}

impl BinningScheme {
    /// Schema label recorded on the bin table; samples binned with
    /// different labels cannot be compared.
    pub fn schema_label(&self) -> String {
        match self {
            BinningScheme::UniformWindows { size } => format!("uniform:{}", size),
            BinningScheme::FragmentGroups {
                per_group,
                boundary_margin,
                ..
            } => format!("fragments:{}:{}", per_group, boundary_margin),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            BinningScheme::UniformWindows { size } => {
                if *size == 0 {
                    return Err(ConfigError::NonPositiveBinSize);
                }
            }
            BinningScheme::FragmentGroups {
                cutsites,
                per_group,
                ..
            } => {
                if *per_group == 0 {
                    return Err(ConfigError::NonPositiveGroupSize);
                }
                if cutsites.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(ConfigError::UnsortedCutsites);
                }
            }
        }
        Ok(())
    }
}

///
/// Build the covariate table for one chromosome.
///
/// Pure function of the genome, the mappability source, and the binning
/// parameters; the result is cached and reused across samples sharing the
/// same assembly and resolution.
///
pub fn build_bin_table(
    chrom: &str,
    genome: &GenomeAssembly,
    mappability: Option<&dyn MappabilitySource>,
    scheme: &BinningScheme,
) -> Result<BinTable, CovariateError> {
    scheme.validate()?;

    let bins = match scheme {
        BinningScheme::UniformWindows { size } => uniform_bins(chrom, genome, mappability, *size)?,
        BinningScheme::FragmentGroups {
            cutsites,
            per_group,
            boundary_margin,
        } => fragment_bins(chrom, genome, mappability, cutsites, *per_group, *boundary_margin)?,
    };

    Ok(BinTable::new(chrom, scheme.schema_label(), bins)?)
}

fn uniform_bins(
    chrom: &str,
    genome: &GenomeAssembly,
    mappability: Option<&dyn MappabilitySource>,
    size: u32,
) -> Result<Vec<GenomicBin>, CovariateError> {
    let chrom_len = genome.chrom_len(chrom)?;

    let mut bins = Vec::new();
    let mut start = 0u32;
    while start < chrom_len {
        let end = (start + size).min(chrom_len);
        let seq = genome.seq(chrom, start, end)?;
        bins.push(GenomicBin {
            start,
            end,
            gc: gc_fraction(seq),
            mappability: mappability.and_then(|m| m.mean(chrom, start, end)),
            // window width minus masked bases
            effective_length: (end - start - masked_bases(seq)) as f64,
            index: 0,
        });
        start = end;
    }
    Ok(bins)
}

fn fragment_bins(
    chrom: &str,
    genome: &GenomeAssembly,
    mappability: Option<&dyn MappabilitySource>,
    cutsites: &[u32],
    per_group: usize,
    boundary_margin: u32,
) -> Result<Vec<GenomicBin>, CovariateError> {
    // fragments are the intervals between consecutive cutsites
    let fragments: Vec<(u32, u32)> = cutsites
        .windows(2)
        .map(|w| (w[0], w[1]))
        .collect();

    let mut bins = Vec::new();
    for group in fragments.chunks(per_group) {
        let start = group[0].0;
        let end = group[group.len() - 1].1;
        let seq = genome.seq(chrom, start, end)?;

        // ligation-accessible length: per fragment, the sequence within
        // boundary_margin of either end
        let effective_length: f64 = group
            .iter()
            .map(|&(s, e)| ((e - s) as f64).min(2.0 * boundary_margin as f64))
            .sum();

        bins.push(GenomicBin {
            start,
            end,
            gc: gc_fraction(seq),
            mappability: mappability.and_then(|m| m.mean(chrom, start, end)),
            effective_length,
            index: 0,
        });
    }
    Ok(bins)
}
