// External distinct counting - the main implementation
pub mod external_count;

// Units and CLI defaults
pub mod constants;

// Logging setup and formatting helpers
pub mod utils;

// Re-export main types for convenience
pub use external_count::{CountError, CountStats, DistinctCountConfig, DistinctCounter, ErrorKind};
