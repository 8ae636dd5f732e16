//! Analysis errors.

use std::path::PathBuf;

use thiserror::Error;

use treerings_core::Fingerprint;

/// Errors from reconciling or persisting an analysis.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// A tree's fingerprint index disagrees with its node index.
    ///
    /// Never produced for trees built by the scanner; seeing it means the
    /// tree was built or edited inconsistently.
    #[error("Inconsistent tree {root}: {fingerprint} lists {path} ({reason})")]
    Inconsistent {
        root: PathBuf,
        fingerprint: Fingerprint,
        path: PathBuf,
        reason: &'static str,
    },

    /// Reading or writing an analysis document failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An analysis document could not be encoded or decoded.
    #[error("Invalid analysis document: {0}")]
    Json(#[from] serde_json::Error),
}
