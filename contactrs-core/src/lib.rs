//! # Core data model for chromatin contact analysis.
//!
//! This crate holds the value objects shared by the rest of the workspace:
//! genomic bins with their modeling covariates, per-chromosome sparse
//! interaction containers, samples (named collections of containers), and
//! filter sets for differential testing. It also defines the error
//! taxonomy used across crates and a few small file utilities.
//!
//! Containers are plain per-chromosome values passed through each pipeline
//! stage; there is no global registry, so chromosomes can be processed in
//! parallel without locking.

pub mod consts;
pub mod errors;
pub mod models;
pub mod utils;

pub use errors::{ConfigError, DataError};
pub use models::bin::{BinTable, GenomicBin};
pub use models::container::{IngestStats, InteractionContainer};
pub use models::filter::FilterSet;
pub use models::record::{CountRecord, InteractionRecord};
pub use models::sample::Sample;
