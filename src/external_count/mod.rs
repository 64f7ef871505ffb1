pub mod config;
pub mod constants;
pub mod error;
pub mod lines;
pub mod run_store;
pub mod chunk;
pub mod merger;
pub mod processor;


pub use config::DistinctCountConfig;
pub use error::{CountError, CountResult, ErrorKind};
pub use processor::DistinctCounter;
pub use run_store::{LineCursor, RunHandle, Workspace};

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Default, Clone, Serialize)]
pub struct CountStats {
    pub lines_read: usize,
    pub unique_values: u64,
    pub runs_created: usize,
    pub values_spilled: usize,
    pub duplicates_in_chunks: usize,
    pub duplicates_across_runs: u64,
    pub spill_bytes: u64,
    pub split_time_ms: u64,
    pub merge_time_ms: u64,
    pub processing_time_ms: u64,
    pub cleanup_warnings: Vec<String>,
}

/// Counts distinct trimmed lines of `source` on a blocking worker thread.
pub async fn count_unique(source: PathBuf, config: DistinctCountConfig) -> Result<CountStats> {
    let counter = DistinctCounter::new(config)?;
    let stats = tokio::task::spawn_blocking(move || counter.process(&source)).await??;
    Ok(stats)
}
