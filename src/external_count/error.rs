use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a distinct count. No variant carries a partial total.
#[derive(Error, Debug)]
pub enum CountError {
    #[error("cannot read source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("run storage failure at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("run {run_id} at {path} is not strictly increasing")]
    CorruptRun { run_id: usize, path: PathBuf },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Storage,
    Config,
    Cancelled,
}

impl CountError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage { path: path.into(), source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Storage { .. } | Self::CorruptRun { .. } => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Config,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Io => "IOError",
            ErrorKind::Storage => "StorageError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

pub type CountResult<T> = std::result::Result<T, CountError>;
