//! Parallel per-sample run driver.
//!
//! Chromosomes are independent: each rayon worker owns one container for
//! the duration of fitting, and the only cross-chromosome step is the
//! optional global BH merge. Seeds are derived per chromosome from the
//! caller's seed and the container's karyotypic position, so parallel runs
//! reproduce bit-identically.

use std::collections::BTreeMap;

use rayon::prelude::*;

use contactrs_core::consts::COV_LOG_DISTANCE;
use contactrs_core::errors::ConfigError;
use contactrs_core::models::sample::Sample;

use crate::correction::{CorrectionScope, correct_container, correct_sample_global};
use crate::significance::{FitOptions, FitOutcome, fit_container};

///
/// Per-chromosome outcome of a run. A failure on one chromosome never
/// aborts its siblings; the run reports this summary instead of a single
/// pass/fail.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChromosomeStatus {
    Scored,
    FallbackUsed,
    Unscored,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    statuses: BTreeMap<String, ChromosomeStatus>,
}

impl RunSummary {
    pub fn status(&self, chrom: &str) -> Option<&ChromosomeStatus> {
        self.statuses.get(chrom)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChromosomeStatus)> {
        self.statuses.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn all_scored(&self) -> bool {
        self.statuses
            .values()
            .all(|s| matches!(s, ChromosomeStatus::Scored))
    }

    pub fn n_chromosomes(&self) -> usize {
        self.statuses.len()
    }
}

///
/// Fit the significance model for every chromosome of the sample in
/// parallel, then apply BH correction at the requested scope.
///
/// Fatal configuration problems (bad options, missing feature expansion)
/// surface before any fitting starts.
///
pub fn fit_sample(
    sample: &mut Sample,
    options: &FitOptions,
    scope: CorrectionScope,
) -> Result<RunSummary, ConfigError> {
    options.validate()?;
    for container in sample.containers() {
        if !container.is_empty() && container.covariate(COV_LOG_DISTANCE).is_none() {
            return Err(ConfigError::MissingCovariate(COV_LOG_DISTANCE.to_string()));
        }
    }

    let per_chromosome = scope == CorrectionScope::PerChromosome;
    let statuses: Vec<(String, ChromosomeStatus)> = sample
        .containers_mut()
        .par_iter_mut()
        .enumerate()
        .map(|(idx, container)| {
            let worker_options = FitOptions {
                seed: options.seed.wrapping_add(idx as u64),
                ..options.clone()
            };
            let status = match fit_container(container, &worker_options) {
                Ok(FitOutcome::Covariate) => ChromosomeStatus::Scored,
                Ok(FitOutcome::DistanceOnly) if options.use_covariates => {
                    ChromosomeStatus::FallbackUsed
                }
                Ok(FitOutcome::DistanceOnly) => ChromosomeStatus::Scored,
                Ok(FitOutcome::Unscored) => ChromosomeStatus::Unscored,
                Err(err) => ChromosomeStatus::Failed(err.to_string()),
            };
            if per_chromosome {
                correct_container(container);
            }
            (container.chrom().to_string(), status)
        })
        .collect();

    if scope == CorrectionScope::Global {
        correct_sample_global(sample);
    }

    Ok(RunSummary {
        statuses: statuses.into_iter().collect(),
    })
}
