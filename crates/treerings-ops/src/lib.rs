//! Backup of missing files for treerings.
//!
//! Files an analysis found missing from the baseline are copied into the
//! baseline root under their relative path. Existing files are never
//! overwritten: a taken name `name.ext` is retried as `name-1.ext`,
//! `name-2.ext` and so on.
//!
//! Backups run synchronously through [`BackupExecutor`] or asynchronously
//! through [`start_backup`], which reports progress over a channel.

mod backup;
pub mod conflict;
mod operation;
mod progress;

pub use backup::{
    BackupExecutor, BackupJob, BackupOutcome, BackupPlan, BackupResult, start_backup,
};
pub use conflict::numbered_path;
pub use operation::OperationError;
pub use progress::{OperationComplete, OperationProgress};

/// Default channel buffer size for backup progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
