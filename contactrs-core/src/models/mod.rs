pub mod bin;
pub mod container;
pub mod filter;
pub mod record;
pub mod sample;

pub use bin::{BinTable, GenomicBin};
pub use container::{IngestStats, InteractionContainer};
pub use filter::FilterSet;
pub use record::{CountRecord, InteractionRecord};
pub use sample::Sample;
