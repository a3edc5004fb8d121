use thiserror::Error;

use contactrs_core::errors::{ConfigError, DataError};

/// Error type for covariate table construction and feature expansion.
#[derive(Error, Debug)]
pub enum CovariateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),
}
