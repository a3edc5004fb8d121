#[cfg(feature = "core")]
#[doc(inline)]
pub use contactrs_core as core;

#[cfg(feature = "covariates")]
#[doc(inline)]
pub use contactrs_covariates as covariates;

#[cfg(feature = "model")]
#[doc(inline)]
pub use contactrs_model as model;

#[cfg(feature = "differential")]
#[doc(inline)]
pub use contactrs_differential as differential;

#[cfg(feature = "io")]
#[doc(inline)]
pub use contactrs_io as io;
