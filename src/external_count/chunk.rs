use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::external_count::error::{CountError, CountResult};
use crate::external_count::lines::{read_line_bytes, trim_bytes};
use crate::external_count::run_store::{RunHandle, Workspace};

#[derive(Debug, Default, Clone, Copy)]
pub struct SplitStats {
    pub lines_read: usize,
    pub values_spilled: usize,
}

impl SplitStats {
    pub fn duplicates_in_chunks(&self) -> usize {
        self.lines_read.saturating_sub(self.values_spilled)
    }
}

/// Reads the source in windows of `chunk_line_limit` lines, deduplicating
/// each window in memory and spilling it to the workspace as one run.
pub struct ChunkDeduplicator {
    chunk_line_limit: usize,
    io_buffer_size: usize,
    skip_blank_lines: bool,
    cancel_check_interval: usize,
    shutdown_flag: Arc<AtomicBool>,
}

impl ChunkDeduplicator {
    pub fn new(chunk_line_limit: usize, io_buffer_size: usize, skip_blank_lines: bool) -> Self {
        Self {
            chunk_line_limit: chunk_line_limit.max(1),
            io_buffer_size,
            skip_blank_lines,
            cancel_check_interval: usize::MAX,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>, check_interval: usize) -> Self {
        self.shutdown_flag = shutdown_flag;
        self.cancel_check_interval = check_interval.max(1);
        self
    }

    pub fn split_into_chunks(
        &self,
        source: &Path,
        workspace: &mut Workspace,
    ) -> CountResult<(Vec<RunHandle>, SplitStats)> {
        let file = File::open(source).map_err(|e| CountError::io(source, e))?;
        let mut reader = BufReader::with_capacity(self.io_buffer_size, file);
        self.split_reader(&mut reader, source, workspace)
    }

    /// Splits any line source; `source` only names it in errors.
    pub fn split_reader<R: BufRead>(
        &self,
        reader: &mut R,
        source: &Path,
        workspace: &mut Workspace,
    ) -> CountResult<(Vec<RunHandle>, SplitStats)> {
        let mut runs = Vec::new();
        let mut stats = SplitStats::default();
        let mut chunk: HashSet<Vec<u8>> = HashSet::new();
        let mut window_lines = 0;

        let mut line = Vec::new();
        loop {
            if stats.lines_read % self.cancel_check_interval == 0
                && self.shutdown_flag.load(Ordering::Relaxed)
            {
                debug!("Split interrupted after {} lines", stats.lines_read);
                return Err(CountError::Cancelled);
            }

            let more = read_line_bytes(reader, &mut line).map_err(|e| CountError::io(source, e))?;
            if !more {
                break;
            }

            stats.lines_read += 1;
            window_lines += 1;

            let value = trim_bytes(&line);
            if !(self.skip_blank_lines && value.is_empty()) && !chunk.contains(value) {
                chunk.insert(value.to_vec());
            }

            // The window is bounded by lines consumed, not by distinct values.
            if window_lines >= self.chunk_line_limit {
                self.flush(&mut chunk, workspace, &mut runs, &mut stats)?;
                window_lines = 0;
            }
        }

        self.flush(&mut chunk, workspace, &mut runs, &mut stats)?;

        debug!(
            "Split {} lines into {} runs ({} values spilled)",
            stats.lines_read, runs.len(), stats.values_spilled
        );

        Ok((runs, stats))
    }

    fn flush(
        &self,
        chunk: &mut HashSet<Vec<u8>>,
        workspace: &mut Workspace,
        runs: &mut Vec<RunHandle>,
        stats: &mut SplitStats,
    ) -> CountResult<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        let handle = workspace.persist_chunk(std::mem::take(chunk))?;
        stats.values_spilled += handle.value_count;
        runs.push(handle);
        Ok(())
    }
}
