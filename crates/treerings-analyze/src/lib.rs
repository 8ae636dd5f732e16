//! Reconciliation of scanned trees for treerings.
//!
//! Given trees in order, the first being the baseline, [`analyze`] classifies
//! every fingerprint:
//!
//! - **Unique** - seen at exactly one path across all trees
//! - **Duplicated** - seen at two or more paths, within or across trees
//! - **Missing** - first seen in a later tree, i.e. absent from every tree
//!   before it. Recorded per root as a root-relative path, ready for backup
//!
//! ```rust,no_run
//! use treerings_analyze::analyze;
//! use treerings_scan::{JwalkScanner, ScanConfig};
//!
//! let scanner = JwalkScanner::new();
//! let baseline = scanner.scan(&ScanConfig::new("/mnt/archive")).unwrap();
//! let laptop = scanner.scan(&ScanConfig::new("/home/me/photos")).unwrap();
//!
//! let analysis = analyze(vec![baseline, laptop]).unwrap();
//! println!("{}", analysis.summary());
//! analysis.save("analysis.json").unwrap();
//! ```

mod analysis;
mod error;
mod persist;
mod reconcile;

pub use analysis::{Analysis, AnalysisSummary};
pub use error::AnalyzeError;
pub use reconcile::analyze;

// Re-export core types
pub use treerings_core::{Fingerprint, Node, Tree};
