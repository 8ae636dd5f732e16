//! Per-file backup errors.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error that occurred while backing up one file.
///
/// Failures are per file: the rest of a backup carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}: {message}", path.display())]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with what was being attempted.
    pub fn io(path: impl Into<PathBuf>, action: &str, err: &io::Error) -> Self {
        Self::new(path, format!("{action}: {err}"))
    }
}
