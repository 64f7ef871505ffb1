use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;
use crate::constants::BYTES_PER_KB;
use crate::external_count::constants::*;
use crate::external_count::error::{CountError, CountResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistinctCountConfig {
    pub chunk_line_limit: usize,
    pub temp_directory: PathBuf,
    pub io_buffer_size_kb: usize,
    pub merge_buffer_size_kb: usize,
    pub skip_blank_lines: bool,
    pub merge_progress_interval_seconds: u64,
    pub cancel_check_interval_lines: usize,
}

impl Default for DistinctCountConfig {
    fn default() -> Self {
        Self {
            chunk_line_limit: DEFAULT_CHUNK_LINE_LIMIT,
            temp_directory: PathBuf::from(TEMP_DIR_NAME),
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            merge_buffer_size_kb: DEFAULT_MERGE_BUFFER_SIZE_KB,
            skip_blank_lines: false,
            merge_progress_interval_seconds: DEFAULT_MERGE_PROGRESS_INTERVAL_SECONDS,
            cancel_check_interval_lines: DEFAULT_CANCEL_CHECK_INTERVAL_LINES,
        }
    }
}

impl DistinctCountConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn with_chunk_line_limit(mut self, chunk_line_limit: usize) -> Self {
        self.chunk_line_limit = chunk_line_limit;
        self
    }

    pub fn with_temp_directory(mut self, temp_directory: impl Into<PathBuf>) -> Self {
        self.temp_directory = temp_directory.into();
        self
    }

    pub fn validate(&self) -> CountResult<()> {
        if self.chunk_line_limit < MIN_CHUNK_LINE_LIMIT
            || self.chunk_line_limit > MAX_CHUNK_LINE_LIMIT {
            return Err(CountError::Config(format!(
                "chunk line limit must be between {} and {}",
                MIN_CHUNK_LINE_LIMIT, MAX_CHUNK_LINE_LIMIT
            )));
        }

        for (name, value) in [
            ("io buffer size", self.io_buffer_size_kb),
            ("merge buffer size", self.merge_buffer_size_kb),
        ] {
            if !(MIN_BUFFER_SIZE_KB..=MAX_BUFFER_SIZE_KB).contains(&value) {
                return Err(CountError::Config(format!(
                    "{} must be between {} and {} KB",
                    name, MIN_BUFFER_SIZE_KB, MAX_BUFFER_SIZE_KB
                )));
            }
        }

        if self.merge_progress_interval_seconds == 0 {
            return Err(CountError::Config(
                "merge progress interval must be at least one second".to_string(),
            ));
        }

        if self.cancel_check_interval_lines == 0 {
            return Err(CountError::Config(
                "cancel check interval must be at least one line".to_string(),
            ));
        }

        if self.temp_directory.as_os_str().is_empty() {
            return Err(CountError::Config("temp directory must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }

    pub fn merge_buffer_size_bytes(&self) -> usize {
        self.merge_buffer_size_kb * BYTES_PER_KB
    }
}
