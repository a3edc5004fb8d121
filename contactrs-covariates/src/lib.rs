//! Genomic bin covariate tables for contact background modeling.
//!
//! This crate builds the per-bin covariate table (GC content, effective
//! length, mappability) for a chromosome under a chosen binning scheme,
//! and expands those 1-D bin covariates into the 2-D interaction-level
//! covariates the significance model regresses on.
//!
//! Covariate tables are pure functions of the genome and the binning
//! parameters, so they can be cached and reused across samples sharing an
//! assembly and resolution.

pub mod binning;
pub mod errors;
pub mod expand;
pub mod genome;
pub mod mappability;

pub use binning::{BinningScheme, build_bin_table};
pub use errors::CovariateError;
pub use expand::{Combine, ExpansionSpec, expand};
pub use genome::GenomeAssembly;
pub use mappability::{InMemoryMappability, MappabilitySource};
