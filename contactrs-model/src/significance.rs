//! Per-chromosome significance fitting.
//!
//! `log(mu) = natural-cubic-spline(log distance) + linear covariate terms`
//! with a jointly estimated negative-binomial dispersion. The regression
//! is fitted on a (possibly downsampled) subset and then applied to every
//! record of the container, so downsampling bounds fitting cost without
//! changing which records get scored.

use ndarray::Array2;

use contactrs_core::consts::COV_LOG_DISTANCE;
use contactrs_core::errors::ConfigError;
use contactrs_core::models::container::InteractionContainer;

use crate::errors::ModelFitError;
use crate::glm;
use crate::nb;
use crate::spline::NaturalSpline;
use crate::strata::{DistanceStrata, downsample_strata};

/// Fewest non-zero counts required in the fitting subset.
pub const MIN_NONZERO_FIT: usize = 10;

#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Number of equal-width log-distance strata.
    pub distance_bins: usize,
    /// Fraction of each stratum used for regression fitting, in (0, 1].
    pub downsample: f64,
    /// Seed for the downsampling generator. Identical seed and input
    /// produce identical output.
    pub seed: u64,
    /// When false, fit the distance-only model directly.
    pub use_covariates: bool,
    /// Degrees of freedom of the distance spline.
    pub spline_df: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            distance_bins: 20,
            downsample: 1.0,
            seed: 0,
            use_covariates: true,
            spline_df: 4,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.distance_bins == 0 {
            return Err(ConfigError::NoDistanceBins);
        }
        if !(self.downsample > 0.0 && self.downsample <= 1.0) {
            return Err(ConfigError::InvalidDownsampleFraction(self.downsample));
        }
        if self.spline_df == 0 {
            return Err(ConfigError::NonPositiveSplineDf);
        }
        Ok(())
    }
}

///
/// Which model ended up scoring the chromosome.
///
/// Fallback is an expected path, not an exception: a failed covariate fit
/// degrades to the distance-only model, and a failed distance-only fit
/// leaves the chromosome unscored (all annotations `None`).
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// Full model: distance spline plus covariate terms.
    Covariate,
    /// Distance spline only.
    DistanceOnly,
    /// No model could be fitted; records carry NA annotations.
    Unscored,
}

///
/// Fit the background model for one chromosome and annotate mu, sdev,
/// p-value, and z-score on every record in place. q-values are assigned
/// by the separate correction step, whose scope is an explicit choice.
///
pub fn fit_container(
    container: &mut InteractionContainer,
    options: &FitOptions,
) -> Result<FitOutcome, ConfigError> {
    options.validate()?;
    if container.is_empty() {
        return Ok(FitOutcome::Unscored);
    }

    let log_d = container
        .covariate(COV_LOG_DISTANCE)
        .ok_or_else(|| ConfigError::MissingCovariate(COV_LOG_DISTANCE.to_string()))?
        .to_vec();

    let strata = DistanceStrata::from_log_distances(&log_d, options.distance_bins);
    let fit_idx = downsample_strata(&log_d, &strata, options.downsample, options.seed);

    let covariate_names: Vec<String> = if options.use_covariates {
        container
            .covariate_names()
            .filter(|name| *name != COV_LOG_DISTANCE)
            .map(|name| name.to_string())
            .collect()
    } else {
        Vec::new()
    };

    match try_fit(container, &log_d, &fit_idx, &covariate_names, options) {
        Ok(()) => {
            if covariate_names.is_empty() {
                return Ok(FitOutcome::DistanceOnly);
            }
            return Ok(FitOutcome::Covariate);
        }
        Err(err) => {
            if covariate_names.is_empty() {
                log::warn!(
                    "{}: distance-only fit failed ({err}); leaving records unscored",
                    container.chrom()
                );
                unscore(container);
                return Ok(FitOutcome::Unscored);
            }
            log::warn!(
                "{}: covariate fit failed ({err}); falling back to distance-only model",
                container.chrom()
            );
        }
    }

    match try_fit(container, &log_d, &fit_idx, &[], options) {
        Ok(()) => Ok(FitOutcome::DistanceOnly),
        Err(err) => {
            log::warn!(
                "{}: distance-only fit failed ({err}); leaving records unscored",
                container.chrom()
            );
            unscore(container);
            Ok(FitOutcome::Unscored)
        }
    }
}

/// Center/scale transform learned from the fitting subset.
struct Standardizer {
    mean: f64,
    sd: f64,
}

impl Standardizer {
    fn from_subset(values: &[f64], idx: &[usize]) -> Option<Self> {
        let n = idx.len() as f64;
        let mean = idx.iter().map(|&i| values[i]).sum::<f64>() / n;
        let var = idx.iter().map(|&i| (values[i] - mean).powi(2)).sum::<f64>() / n;
        let sd = var.sqrt();
        // constant columns carry no information and break the solver
        if sd < 1e-12 { None } else { Some(Standardizer { mean, sd }) }
    }

    fn apply(&self, v: f64) -> f64 {
        (v - self.mean) / self.sd
    }
}

fn try_fit(
    container: &mut InteractionContainer,
    log_d: &[f64],
    fit_idx: &[usize],
    covariate_names: &[String],
    options: &FitOptions,
) -> Result<(), ModelFitError> {
    let y_fit: Vec<f64> = fit_idx
        .iter()
        .map(|&i| container.records()[i].count as f64)
        .collect();
    let nonzero = y_fit.iter().filter(|&&v| v > 0.0).count();
    if nonzero < MIN_NONZERO_FIT {
        return Err(ModelFitError::DegenerateData {
            nonzero,
            total: y_fit.len(),
        });
    }

    let fit_log_d: Vec<f64> = fit_idx.iter().map(|&i| log_d[i]).collect();
    let spline = NaturalSpline::from_quantiles(&fit_log_d, options.spline_df)?;

    // covariate columns, with their standardizers; constant ones drop out
    let mut columns: Vec<(&[f64], Standardizer)> = Vec::new();
    for name in covariate_names {
        let values = container
            .covariate(name)
            .expect("covariate names come from the container");
        if let Some(std) = Standardizer::from_subset(values, fit_idx) {
            columns.push((values, std));
        }
    }

    let n_cols = 1 + spline.df() + columns.len();
    if y_fit.len() <= n_cols + 2 {
        return Err(ModelFitError::DegenerateData {
            nonzero,
            total: y_fit.len(),
        });
    }

    let row_for = |i: usize| -> Vec<f64> {
        let mut row = Vec::with_capacity(n_cols);
        row.push(1.0);
        row.extend(spline.basis(log_d[i]));
        for (values, std) in &columns {
            row.push(std.apply(values[i]));
        }
        row
    };

    let mut design = Array2::zeros((fit_idx.len(), n_cols));
    for (r, &i) in fit_idx.iter().enumerate() {
        for (c, v) in row_for(i).into_iter().enumerate() {
            design[[r, c]] = v;
        }
    }

    let fit = glm::fit_nb_glm(&y_fit, &design, None)?;

    // score every record, downsampled-out ones included
    let rows: Vec<Vec<f64>> = (0..container.len()).map(row_for).collect();
    for (record, row) in container.records_mut().iter_mut().zip(rows) {
        let mu = fit.predict(&row, 0.0);
        let sdev = nb::nb_sdev(mu, fit.alpha);
        record.mu = Some(mu);
        record.sdev = Some(sdev);
        record.p_value = Some(nb::nb_upper_tail(record.count, mu, fit.alpha));
        record.z_score = Some(nb::z_score(record.count, mu, sdev));
        record.q_value = None;
    }
    Ok(())
}

fn unscore(container: &mut InteractionContainer) {
    for record in container.records_mut() {
        record.clear_scores();
    }
}
