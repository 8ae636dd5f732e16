//! Progress reporting types for backups.

use std::path::PathBuf;

use crate::OperationError;

/// Progress information for an ongoing backup.
#[derive(Debug, Clone, Default)]
pub struct OperationProgress {
    /// Number of files attempted so far.
    pub files_completed: usize,
    /// Total number of files to back up.
    pub files_total: usize,
    /// Number of bytes copied so far.
    pub bytes_processed: u64,
    /// Total bytes to copy, as recorded at scan time.
    pub bytes_total: u64,
    /// The file currently being copied.
    pub current_file: Option<PathBuf>,
    /// Errors encountered so far.
    pub errors: Vec<OperationError>,
}

impl OperationProgress {
    /// Create a new progress tracker.
    pub fn new(files_total: usize, bytes_total: u64) -> Self {
        Self {
            files_total,
            bytes_total,
            ..Default::default()
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.bytes_total > 0 {
            (self.bytes_processed as f64 / self.bytes_total as f64 * 100.0).min(100.0)
        } else if self.files_total > 0 {
            (self.files_completed as f64 / self.files_total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Check if the backup has any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Record a failed file.
    pub fn add_error(&mut self, error: OperationError) {
        self.files_completed += 1;
        self.errors.push(error);
    }

    /// Record a copied file.
    pub fn complete_file(&mut self, bytes: u64) {
        self.files_completed += 1;
        self.bytes_processed += bytes;
    }

    /// Final tally.
    pub fn finish(self) -> OperationComplete {
        OperationComplete {
            succeeded: self.files_completed - self.errors.len(),
            failed: self.errors.len(),
            bytes_processed: self.bytes_processed,
            errors: self.errors,
        }
    }
}

/// Result of a completed backup.
#[derive(Debug, Clone, Default)]
pub struct OperationComplete {
    /// Number of files copied.
    pub succeeded: usize,
    /// Number of files that failed.
    pub failed: usize,
    /// Total bytes copied.
    pub bytes_processed: u64,
    /// Errors that occurred.
    pub errors: Vec<OperationError>,
}

impl OperationComplete {
    /// Check if the backup was fully successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Get a human-readable summary of the backup.
    pub fn summary(&self) -> String {
        if self.failed == 0 {
            format!("Backed up {} files", self.succeeded)
        } else {
            format!("Backed up {} files, {} failed", self.succeeded, self.failed)
        }
    }
}
