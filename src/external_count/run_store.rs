use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

use crate::external_count::constants::*;
use crate::external_count::error::{CountError, CountResult};
use crate::external_count::lines::{read_line_bytes, trim_bytes};

/// A persisted, sorted, duplicate-free run produced from one chunk.
#[derive(Debug, Clone, Serialize)]
pub struct RunHandle {
    pub run_id: usize,
    pub path: PathBuf,
    pub value_count: usize,
    pub file_size_bytes: u64,
}

/// Scoped directory holding the runs of a single count.
///
/// The per-call directory lives inside `base` and is removed when the
/// workspace is dropped, so early returns and unwinding never leave runs
/// behind. `delete_all` does the same removal but reports what failed.
/// Directories created on the way to `base` are removed too, once empty.
pub struct Workspace {
    base: PathBuf,
    created_root: Option<PathBuf>,
    dir: Option<TempDir>,
    io_buffer_size: usize,
    next_run_id: usize,
}

impl Workspace {
    pub fn create(base: &Path, io_buffer_size: usize) -> CountResult<Self> {
        if base.exists() && !base.is_dir() {
            return Err(CountError::storage(
                base,
                io::Error::new(io::ErrorKind::AlreadyExists, "path exists and is not a directory"),
            ));
        }

        let created_root = outermost_missing_ancestor(base);

        // A concurrent counter may remove an empty shared base between the
        // two calls below.
        let mut attempt = 0;
        let dir = loop {
            fs::create_dir_all(base).map_err(|e| CountError::storage(base, e))?;
            match Builder::new().prefix(WORKSPACE_DIR_PREFIX).tempdir_in(base) {
                Ok(dir) => break dir,
                Err(e) if e.kind() == io::ErrorKind::NotFound && attempt < WORKSPACE_CREATE_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(CountError::storage(base, e)),
            }
        };

        debug!("Workspace created at {}", dir.path().display());

        Ok(Self {
            base: base.to_path_buf(),
            created_root,
            dir: Some(dir),
            io_buffer_size,
            next_run_id: 0,
        })
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => self.base.as_path(),
        }
    }

    /// Sorts the chunk and writes it as a new run, one value per line.
    pub fn persist_chunk(&mut self, chunk: HashSet<Vec<u8>>) -> CountResult<RunHandle> {
        let mut values: Vec<Vec<u8>> = chunk.into_iter().collect();
        values.par_sort_unstable();

        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let path = self.path().join(format!(
            "{}{:06}{}",
            RUN_FILE_PREFIX, run_id, RUN_FILE_EXTENSION
        ));

        let file = File::create(&path).map_err(|e| CountError::storage(&path, e))?;
        let mut writer = BufWriter::with_capacity(self.io_buffer_size, file);

        for value in &values {
            writer.write_all(value).map_err(|e| CountError::storage(&path, e))?;
            writer.write_all(b"\n").map_err(|e| CountError::storage(&path, e))?;
        }

        writer.flush().map_err(|e| CountError::storage(&path, e))?;
        let file_size_bytes = fs::metadata(&path)
            .map_err(|e| CountError::storage(&path, e))?
            .len();

        debug!("Run {} written: {} values, {} bytes", run_id, values.len(), file_size_bytes);

        Ok(RunHandle {
            run_id,
            path,
            value_count: values.len(),
            file_size_bytes,
        })
    }

    pub fn open_for_read(&self, handle: &RunHandle, buffer_size: usize) -> CountResult<LineCursor> {
        LineCursor::open(handle, buffer_size)
    }

    /// Best-effort removal of every run, the workspace directory and any base
    /// directories this workspace created that are now empty.
    pub fn delete_all(mut self, handles: &[RunHandle]) -> Vec<String> {
        let mut warnings = Vec::new();

        for handle in handles {
            if let Err(e) = fs::remove_file(&handle.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warnings.push(format!("failed to remove run {}: {}", handle.path.display(), e));
                }
            }
        }

        if let Some(dir) = self.dir.take() {
            let dir_path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warnings.push(format!("failed to remove workspace {}: {}", dir_path.display(), e));
            }
        }

        if let Some(warning) = self.remove_created_dirs() {
            warnings.push(warning);
        }

        for warning in &warnings {
            warn!("Cleanup: {}", warning);
        }

        warnings
    }

    fn remove_created_dirs(&mut self) -> Option<String> {
        let root = self.created_root.take()?;

        for dir in self.base.ancestors() {
            let is_empty = match fs::read_dir(dir) {
                Ok(mut entries) => entries.next().is_none(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => true,
                Err(e) => return Some(format!("failed to inspect {}: {}", dir.display(), e)),
            };

            // Another counter may still be using the shared base.
            if !is_empty {
                return None;
            }

            if let Err(e) = fs::remove_dir(dir) {
                if e.kind() != io::ErrorKind::NotFound {
                    return Some(format!("failed to remove {}: {}", dir.display(), e));
                }
            }

            if dir == root.as_path() {
                break;
            }
        }

        None
    }
}

/// The highest directory on the way to `path` that does not exist yet.
fn outermost_missing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
        .last()
        .map(Path::to_path_buf)
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!("Failed to remove workspace on drop: {}", e);
            }
        }
        if let Some(warning) = self.remove_created_dirs() {
            warn!("{}", warning);
        }
    }
}

/// Forward-only reader over one run.
///
/// `next_value` returns `Ok(None)` only at the end of the run. Runs are
/// written strictly increasing; anything else is reported as corruption
/// because the merge would silently miscount.
pub struct LineCursor {
    run_id: usize,
    path: PathBuf,
    reader: BufReader<File>,
    line: Vec<u8>,
    previous: Option<Vec<u8>>,
}

impl LineCursor {
    pub fn open(handle: &RunHandle, buffer_size: usize) -> CountResult<Self> {
        let file = File::open(&handle.path).map_err(|e| CountError::storage(&handle.path, e))?;
        Ok(Self {
            run_id: handle.run_id,
            path: handle.path.clone(),
            reader: BufReader::with_capacity(buffer_size, file),
            line: Vec::new(),
            previous: None,
        })
    }

    pub fn run_id(&self) -> usize {
        self.run_id
    }

    pub fn next_value(&mut self) -> CountResult<Option<Vec<u8>>> {
        let more = read_line_bytes(&mut self.reader, &mut self.line)
            .map_err(|e| CountError::io(&self.path, e))?;
        if !more {
            return Ok(None);
        }

        let value = trim_bytes(&self.line).to_vec();
        if let Some(previous) = &self.previous {
            if value <= *previous {
                return Err(CountError::CorruptRun {
                    run_id: self.run_id,
                    path: self.path.clone(),
                });
            }
        }

        self.previous = Some(value.clone());
        Ok(Some(value))
    }
}
