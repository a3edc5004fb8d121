//! # Input/Output for contact analysis tables.
//!
//! Row-oriented text interfaces to the excluded collaborators: raw count
//! triplet streams, serialized interaction containers (round-trip exact),
//! filter files for differential testing, and differential result tables.
//! All readers accept plain or gzip'd files transparently.

pub mod container;
pub mod counts;
pub mod differential;
pub mod error;
pub mod filter;

pub use container::{read_container, write_container};
pub use counts::read_counts;
pub use differential::write_differential;
pub use error::TableError;
pub use filter::read_filter;
