use thiserror::Error;

/// Regression failures. These are recovered locally -- either through the
/// fallback model chain or by marking records as unscored -- and are never
/// fatal for a whole run.
#[derive(Error, Debug)]
pub enum ModelFitError {
    #[error("IRLS did not converge after {0} iterations")]
    NonConvergence(usize),

    #[error("Design matrix is singular")]
    SingularDesign,

    #[error("Too few informative records to fit ({nonzero} non-zero of {total})")]
    DegenerateData { nonzero: usize, total: usize },

    #[error("Dispersion estimation failed: {0}")]
    Dispersion(String),
}
