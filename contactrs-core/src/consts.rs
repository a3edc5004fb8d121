//! Canonical covariate column names shared across the workspace.

/// GC content of a bin (fraction of G/C bases).
pub const COV_GC: &str = "gc";

/// Ligation-accessible length of a bin.
pub const COV_EFFECTIVE_LENGTH: &str = "effective_length";

/// Mean mappability of a bin. Only present when a track was supplied.
pub const COV_MAPPABILITY: &str = "mappability";

/// Log-transformed anchor distance, added by feature expansion.
pub const COV_LOG_DISTANCE: &str = "log_distance";
