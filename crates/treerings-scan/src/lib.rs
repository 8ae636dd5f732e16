//! Directory walking and sampled fingerprinting for treerings.
//!
//! # Overview
//!
//! `treerings-scan` turns a root path into a [`Tree`]: every regular file
//! below the root is fingerprinted and indexed by fingerprint and by path.
//!
//! - **Bounded sampling**: at most 1 MiB of each file is hashed, see
//!   [`fingerprint()`] for exactly which bytes
//! - **Failure tolerant**: unreadable files get a size-only fingerprint and
//!   the walk carries on; only the root itself can fail a scan
//! - **Linked directories** are followed into the same tree, with a descent
//!   stack preventing cycles
//! - **Hidden entries** are excluded unless the config says otherwise
//!
//! # Example
//!
//! ```rust,no_run
//! use treerings_scan::{JwalkScanner, ScanConfig};
//!
//! let config = ScanConfig::new("/path/to/scan");
//! let tree = JwalkScanner::new().scan(&config).unwrap();
//!
//! println!("{} files, {} distinct fingerprints", tree.file_count(), tree.fingerprints.len());
//! ```
//!
//! # Several roots
//!
//! Roots are independent, so they scan in parallel:
//!
//! ```rust,no_run
//! use treerings_scan::{JwalkScanner, ScanConfig};
//!
//! let configs = vec![ScanConfig::new("/mnt/backup"), ScanConfig::new("/home/me/photos")];
//! for result in JwalkScanner::new().scan_all(&configs, &[]) {
//!     match result {
//!         Ok(tree) => println!("{}: {} files", tree.root.display(), tree.file_count()),
//!         Err(err) => eprintln!("{err}"),
//!     }
//! }
//! ```

mod descent;
pub mod fingerprint;
mod progress;
mod scanner;

pub use descent::DescentStack;
pub use fingerprint::{
    FingerprintOutcome, SAMPLE_BODY, SAMPLE_HEAD, SAMPLE_MAX, SAMPLE_TAIL, fingerprint,
};
pub use progress::ScanProgress;
pub use scanner::JwalkScanner;

// Re-export core types for convenience
pub use treerings_core::{
    Fingerprint, Node, ScanConfig, ScanError, ScanWarning, Tree, WarningKind,
};
