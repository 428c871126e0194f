//! Novel store error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the novel store
#[derive(Debug, Error)]
pub enum NovelError {
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read file: {}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Format not supported: {format}")]
    UnsupportedFormat { format: String },

    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Document not open: {}", path.display())]
    NotOpen { path: PathBuf },

    #[error("File {} is {size} bytes, limit is {limit} bytes", path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Read progress must be within 0-100, got {0}")]
    InvalidProgress(f64),
}

/// Fieldless classification of a [`NovelError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ReadFailure,
    UnsupportedFormat,
    IndexOutOfRange,
    NotOpen,
    FileTooLarge,
    InvalidProgress,
}

impl NovelError {
    /// Classify this error for a host that only needs the kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            NovelError::NotFound { .. } => ErrorKind::NotFound,
            NovelError::ReadFailure { .. } => ErrorKind::ReadFailure,
            NovelError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            NovelError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            NovelError::NotOpen { .. } => ErrorKind::NotOpen,
            NovelError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            NovelError::InvalidProgress(_) => ErrorKind::InvalidProgress,
        }
    }

    /// Map an I/O error on `path` to `NotFound` or `ReadFailure`
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            NovelError::NotFound { path }
        } else {
            NovelError::ReadFailure { path, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, NovelError>;
