//! Copying missing files into the baseline tree.

use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use treerings_analyze::Analysis;
use treerings_core::Tree;

use crate::conflict::candidates;
use crate::progress::{OperationComplete, OperationProgress};
use crate::{OPERATION_CHANNEL_SIZE, OperationError};

/// One file to copy into the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupJob {
    /// Root of the tree the file was found in.
    pub root: PathBuf,
    /// Path of the file relative to `root`, as recorded in the analysis.
    pub relative: PathBuf,
    /// Absolute path to copy from.
    pub source: PathBuf,
    /// Preferred destination; the copy may land at a numbered variant.
    pub destination: PathBuf,
    /// Size recorded at scan time, 0 if unknown.
    pub size: u64,
}

/// Everything a backup of an analysis would copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPlan {
    /// The baseline root receiving the copies.
    pub baseline: PathBuf,
    /// Jobs in analysis order.
    pub jobs: Vec<BackupJob>,
}

impl BackupPlan {
    /// Plan copying every missing file of `analysis` into its baseline.
    ///
    /// Each file keeps its path relative to its own root.
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let Some(baseline) = analysis.baseline() else {
            if !analysis.missing.is_empty() {
                warn!("Analysis has missing files but no baseline tree, nothing to back up");
            }
            return Self::default();
        };

        let mut jobs = Vec::with_capacity(analysis.missing_count());
        for (root, paths) in &analysis.missing {
            let tree = analysis.trees.iter().find(|t| &t.root == root);
            for relative in paths {
                let source = tree
                    .and_then(|t| locate(t, relative))
                    .unwrap_or_else(|| root.join(relative));
                let size = tree
                    .and_then(|t| t.get(&source))
                    .map_or(0, |node| node.size);
                jobs.push(BackupJob {
                    root: root.clone(),
                    relative: relative.clone(),
                    destination: baseline.root.join(relative),
                    source,
                    size,
                });
            }
        }

        Self {
            baseline: baseline.root.clone(),
            jobs,
        }
    }

    /// Number of files to copy.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if there is nothing to copy.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Sum of the recorded sizes.
    pub fn total_bytes(&self) -> u64 {
        self.jobs.iter().map(|job| job.size).sum()
    }
}

/// The absolute path a missing relative path was derived from.
///
/// Files reached through a link to outside the root are recorded with their
/// absolute layout, so they are found by suffix rather than under the root.
fn locate(tree: &Tree, relative: &Path) -> Option<PathBuf> {
    let under_root = tree.root.join(relative);
    if tree.get(&under_root).is_some() {
        return Some(under_root);
    }
    tree.fingerprints
        .values()
        .filter_map(|paths| paths.first())
        .find(|path| !path.starts_with(&tree.root) && path.ends_with(relative))
        .cloned()
}

/// Outcome of backing up one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The file was copied to `destination`.
    Copied {
        source: PathBuf,
        destination: PathBuf,
        bytes: u64,
    },
    /// The file could not be copied; nothing was left behind.
    Failed(OperationError),
}

impl BackupOutcome {
    /// Check if the file was copied.
    pub fn is_copied(&self) -> bool {
        matches!(self, Self::Copied { .. })
    }

    /// Where the copy landed.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Copied { destination, .. } => Some(destination),
            Self::Failed(_) => None,
        }
    }
}

/// Copies planned files without ever overwriting.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupExecutor;

impl BackupExecutor {
    /// Create a new executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Back up every missing file of `analysis`.
    pub fn backup_missing(&self, analysis: &Analysis) -> Vec<BackupOutcome> {
        self.run(&BackupPlan::from_analysis(analysis))
    }

    /// Execute `plan`, one outcome per job in plan order.
    ///
    /// A failed job never stops the others.
    pub fn run(&self, plan: &BackupPlan) -> Vec<BackupOutcome> {
        info!(
            "Backing up {} missing files to {}",
            plan.len(),
            plan.baseline.display()
        );

        let mut progress = OperationProgress::new(plan.len(), plan.total_bytes());
        let outcomes: Vec<_> = plan
            .jobs
            .iter()
            .map(|job| {
                let outcome = self.execute(job);
                record(&mut progress, &outcome);
                outcome
            })
            .collect();

        info!("{}", progress.finish().summary());
        outcomes
    }

    /// Copy one file to the first free destination name.
    pub fn execute(&self, job: &BackupJob) -> BackupOutcome {
        match copy_new(&job.source, &job.destination) {
            Ok((destination, bytes)) => {
                debug!(
                    "Copied {} to {}",
                    job.source.display(),
                    destination.display()
                );
                BackupOutcome::Copied {
                    source: job.source.clone(),
                    destination,
                    bytes,
                }
            }
            Err(err) => {
                warn!("Couldn't back up {}", err);
                BackupOutcome::Failed(err)
            }
        }
    }
}

fn record(progress: &mut OperationProgress, outcome: &BackupOutcome) {
    match outcome {
        BackupOutcome::Copied { bytes, .. } => progress.complete_file(*bytes),
        BackupOutcome::Failed(err) => progress.add_error(err.clone()),
    }
}

/// Copy `source` to `preferred` or its first free numbered variant.
///
/// Destinations are created exclusively: a name that appears between probing
/// and creation counts as taken. A destination that was created but could not
/// be filled is removed again.
fn copy_new(source: &Path, preferred: &Path) -> Result<(PathBuf, u64), OperationError> {
    let mut input = File::open(source)
        .map_err(|e| OperationError::io(source, "Failed to open source", &e))?;

    if let Some(parent) = preferred.parent() {
        create_parents(parent)
            .map_err(|e| OperationError::io(parent, "Failed to create parent directory", &e))?;
    }

    for destination in candidates(preferred) {
        let mut output = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(OperationError::io(
                    &destination,
                    "Failed to create destination",
                    &e,
                ));
            }
        };

        return match io::copy(&mut input, &mut output).and_then(|bytes| {
            output.sync_all()?;
            Ok(bytes)
        }) {
            Ok(bytes) => Ok((destination, bytes)),
            Err(e) => {
                drop(output);
                if let Err(cleanup) = fs::remove_file(&destination) {
                    warn!(
                        "Failed to remove partial copy {}: {}",
                        destination.display(),
                        cleanup
                    );
                }
                Err(OperationError::io(source, "Failed to copy", &e))
            }
        };
    }

    Err(OperationError::new(preferred, "No free destination name left"))
}

fn create_parents(dir: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o775);
    }
    builder.create(dir)
}

/// Result sent through the channel during a backup.
#[derive(Debug)]
pub enum BackupResult {
    /// Progress update, sent before each file.
    Progress(OperationProgress),
    /// One file finished.
    Item(BackupOutcome),
    /// The backup completed.
    Complete(OperationComplete),
}

/// Start an async backup of `plan`.
///
/// Copies run on the blocking pool one file at a time. Returns a receiver for
/// progress updates and results; dropping it stops the backup after the file
/// in flight.
pub fn start_backup(plan: BackupPlan) -> mpsc::Receiver<BackupResult> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        backup_impl(plan, tx).await;
    });

    rx
}

async fn backup_impl(plan: BackupPlan, tx: mpsc::Sender<BackupResult>) {
    info!(
        "Backing up {} missing files to {}",
        plan.len(),
        plan.baseline.display()
    );
    let mut progress = OperationProgress::new(plan.len(), plan.total_bytes());
    let executor = BackupExecutor::new();

    for job in plan.jobs {
        progress.current_file = Some(job.source.clone());
        if tx.send(BackupResult::Progress(progress.clone())).await.is_err() {
            return;
        }

        let source = job.source.clone();
        let outcome = tokio::task::spawn_blocking(move || executor.execute(&job))
            .await
            .unwrap_or_else(|e| {
                BackupOutcome::Failed(OperationError::new(source, format!("Task failed: {e}")))
            });

        record(&mut progress, &outcome);
        if tx.send(BackupResult::Item(outcome)).await.is_err() {
            return;
        }
    }

    progress.current_file = None;
    let complete = progress.finish();
    info!("{}", complete.summary());
    let _ = tx.send(BackupResult::Complete(complete)).await;
}
