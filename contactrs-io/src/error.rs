use std::io;

use thiserror::Error;

use contactrs_core::errors::{ConfigError, DataError};

/// Error type for contactrs-io operations.
#[derive(Error, Debug)]
pub enum TableError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or inconsistent table content.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Reassembled container violated a structural invariant.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic read failure with context.
    #[error("Can't read file: {0}")]
    FileRead(String),
}

/// Result type alias for contactrs-io operations.
pub type Result<T> = std::result::Result<T, TableError>;
