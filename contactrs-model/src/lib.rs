//! Significance modeling for chromatin contact data.
//!
//! Fits a distance-stratified negative-binomial regression per chromosome
//! to estimate the expected contact count and its variance for every bin
//! pair, then derives upper-tail p-values, BH-corrected q-values, and
//! z-scores. Fitting failures degrade through an explicit fallback chain
//! (covariate model → distance-only model → unscored) instead of aborting
//! the chromosome.
//!
//! Chromosomes are independent units of work; [`run::fit_sample`] fans
//! them out over a rayon pool with a deterministic per-chromosome seed.

pub mod correction;
pub mod errors;
pub mod glm;
pub mod nb;
pub mod run;
pub mod significance;
pub mod spline;
pub mod strata;

pub use correction::{CorrectionScope, benjamini_hochberg, correct_container, correct_sample_global};
pub use errors::ModelFitError;
pub use glm::NbGlm;
pub use run::{ChromosomeStatus, RunSummary, fit_sample};
pub use significance::{FitOptions, FitOutcome, fit_container};
