//! Differential contact testing across conditions with replicates.
//!
//! Raw counts are normalized through each replicate's previously fitted
//! expected count (used as a GLM offset), per-interaction dispersions are
//! estimated with empirical-Bayes style shrinkage toward a mean-dispersion
//! trend, and each non-reference condition is contrasted against its chain
//! predecessor with a Wald test. q-values are BH-corrected across all
//! tested interactions of the run.

pub mod compare;
pub mod dispersion;

pub use compare::{Condition, DifferentialResult, compare};
pub use dispersion::{DispersionTrend, TREND_PRIOR_DF, shrink};
