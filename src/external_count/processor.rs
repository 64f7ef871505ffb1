use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::constants::BYTES_PER_MB;
use crate::external_count::{CountStats, DistinctCountConfig};
use crate::external_count::chunk::ChunkDeduplicator;
use crate::external_count::constants::OPEN_RUNS_WARNING_THRESHOLD;
use crate::external_count::error::CountResult;
use crate::external_count::merger::KWayMerger;
use crate::external_count::run_store::{RunHandle, Workspace};

/// Runs split, merge and cleanup for one source file per call.
///
/// Nothing is carried between calls; each one gets a fresh workspace that is
/// released on every exit path.
pub struct DistinctCounter {
    config: DistinctCountConfig,
    shutdown_flag: Arc<AtomicBool>,
}

impl DistinctCounter {
    pub fn new(config: DistinctCountConfig) -> CountResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    pub fn count_unique(&self, source: &Path) -> CountResult<u64> {
        self.process(source).map(|stats| stats.unique_values)
    }

    pub fn process(&self, source: &Path) -> CountResult<CountStats> {
        let start_time = Instant::now();
        info!("Counting distinct lines in {}", source.display());

        let mut workspace = Workspace::create(
            &self.config.temp_directory,
            self.config.io_buffer_size_bytes(),
        )?;

        let mut runs = Vec::new();
        let outcome = self.split_and_merge(source, &mut workspace, &mut runs);
        let cleanup_warnings = workspace.delete_all(&runs);

        let mut stats = outcome?;
        stats.cleanup_warnings = cleanup_warnings;
        stats.processing_time_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Counted {} distinct values from {} lines in {} ms",
            stats.unique_values, stats.lines_read, stats.processing_time_ms
        );

        Ok(stats)
    }

    fn split_and_merge(
        &self,
        source: &Path,
        workspace: &mut Workspace,
        runs: &mut Vec<RunHandle>,
    ) -> CountResult<CountStats> {
        let mut stats = CountStats::default();

        let split_start = Instant::now();
        let deduplicator = ChunkDeduplicator::new(
            self.config.chunk_line_limit,
            self.config.io_buffer_size_bytes(),
            self.config.skip_blank_lines,
        )
        .with_shutdown_signal(self.shutdown_flag.clone(), self.config.cancel_check_interval_lines);

        let (created, split) = deduplicator.split_into_chunks(source, workspace)?;
        *runs = created;
        stats.split_time_ms = split_start.elapsed().as_millis() as u64;
        stats.lines_read = split.lines_read;
        stats.values_spilled = split.values_spilled;
        stats.duplicates_in_chunks = split.duplicates_in_chunks();
        stats.runs_created = runs.len();
        stats.spill_bytes = runs.iter().map(|r| r.file_size_bytes).sum();

        debug!(
            "Split phase: {} runs, {:.2} MB spilled to {}",
            stats.runs_created,
            stats.spill_bytes as f64 / BYTES_PER_MB as f64,
            workspace.path().display()
        );

        // The merge keeps one open file per run.
        if stats.runs_created > OPEN_RUNS_WARNING_THRESHOLD {
            warn!(
                "{} runs will be open at once during the merge; raise the chunk line limit if the file limit is hit",
                stats.runs_created
            );
        }

        let merge_start = Instant::now();
        let merger = KWayMerger::new(
            self.config.merge_buffer_size_bytes(),
            self.config.merge_progress_interval_seconds,
        )
        .with_shutdown_signal(self.shutdown_flag.clone(), self.config.cancel_check_interval_lines);

        let merged = merger.merge_and_count(workspace, runs)?;
        stats.merge_time_ms = merge_start.elapsed().as_millis() as u64;
        stats.unique_values = merged.unique_values;
        stats.duplicates_across_runs = merged.duplicates_across_runs;

        Ok(stats)
    }
}
