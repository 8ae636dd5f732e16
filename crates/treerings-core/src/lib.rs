//! Core types for treerings.
//!
//! This crate provides the data structures shared by the scanner, the
//! analysis engine and the backup executor: observed nodes, sampled content
//! fingerprints, the per-root tree index and scan configuration.

mod config;
mod error;
mod node;
mod tree;

pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use node::{Fingerprint, Node, millis_since_epoch};
pub use tree::Tree;
