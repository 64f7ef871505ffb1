use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::external_count::constants::{MERGE_HEAP_INITIAL_CAPACITY, PROGRESS_CHECK_INTERVAL_VALUES};
use crate::external_count::error::{CountError, CountResult};
use crate::external_count::run_store::{LineCursor, RunHandle, Workspace};

#[derive(Debug, Default, Clone, Copy)]
pub struct MergeStats {
    pub unique_values: u64,
    pub duplicates_across_runs: u64,
}

/// Head value of one open run.
#[derive(Debug)]
struct FrontierEntry {
    value: Vec<u8>,
    cursor_index: usize,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then(self.cursor_index.cmp(&other.cursor_index))
    }
}

pub struct KWayMerger {
    merge_buffer_size: usize,
    progress_interval: Duration,
    cancel_check_interval: u64,
    shutdown_flag: Arc<AtomicBool>,
}

impl KWayMerger {
    pub fn new(merge_buffer_size: usize, progress_interval_seconds: u64) -> Self {
        Self {
            merge_buffer_size,
            progress_interval: Duration::from_secs(progress_interval_seconds),
            cancel_check_interval: u64::MAX,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>, check_interval: usize) -> Self {
        self.shutdown_flag = shutdown_flag;
        self.cancel_check_interval = check_interval.max(1) as u64;
        self
    }

    pub fn merge_and_count(&self, workspace: &Workspace, runs: &[RunHandle]) -> CountResult<MergeStats> {
        let mut stats = MergeStats::default();
        if runs.is_empty() {
            return Ok(stats);
        }

        let mut cursors = runs
            .iter()
            .map(|run| workspace.open_for_read(run, self.merge_buffer_size))
            .collect::<CountResult<Vec<LineCursor>>>()?;

        let mut frontier = BinaryHeap::with_capacity(runs.len().min(MERGE_HEAP_INITIAL_CAPACITY));
        for (cursor_index, cursor) in cursors.iter_mut().enumerate() {
            if let Some(value) = cursor.next_value()? {
                frontier.push(Reverse(FrontierEntry { value, cursor_index }));
            }
        }

        let total_values: usize = runs.iter().map(|r| r.value_count).sum();
        let mut consumed: u64 = 0;
        let mut last_progress_time = Instant::now();

        debug!("Merging {} runs holding {} values", runs.len(), total_values);

        while let Some(Reverse(smallest)) = frontier.pop() {
            if stats.unique_values % self.cancel_check_interval == 0
                && self.shutdown_flag.load(AtomicOrdering::Relaxed)
            {
                debug!("Merge interrupted after {} distinct values", stats.unique_values);
                return Err(CountError::Cancelled);
            }

            stats.unique_values += 1;
            consumed += 1;
            Self::advance(&mut cursors, &mut frontier, smallest.cursor_index)?;

            // Every run whose head equals the value just counted must move on
            // in this same step, or the value would be counted again later.
            while let Some(Reverse(head)) = frontier.peek() {
                if head.value != smallest.value {
                    break;
                }
                let cursor_index = head.cursor_index;
                frontier.pop();
                stats.duplicates_across_runs += 1;
                consumed += 1;
                Self::advance(&mut cursors, &mut frontier, cursor_index)?;
            }

            if stats.unique_values % PROGRESS_CHECK_INTERVAL_VALUES == 0
                && last_progress_time.elapsed() >= self.progress_interval
            {
                let progress_pct = if total_values > 0 {
                    (consumed as f64 / total_values as f64 * 100.0).min(100.0)
                } else {
                    0.0
                };
                info!(
                    "Merge progress: {:.1}% ({} distinct, {} cross-run duplicates)",
                    progress_pct, stats.unique_values, stats.duplicates_across_runs
                );
                last_progress_time = Instant::now();
            }
        }

        Ok(stats)
    }

    fn advance(
        cursors: &mut [LineCursor],
        frontier: &mut BinaryHeap<Reverse<FrontierEntry>>,
        cursor_index: usize,
    ) -> CountResult<()> {
        if let Some(value) = cursors[cursor_index].next_value()? {
            frontier.push(Reverse(FrontierEntry { value, cursor_index }));
        } else {
            debug!("Run {} exhausted", cursors[cursor_index].run_id());
        }
        Ok(())
    }
}
