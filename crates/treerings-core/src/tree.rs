//! Per-root fingerprint index.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ScanWarning;
use crate::node::{Fingerprint, Node};

/// The result of scanning one root.
///
/// Both indices keep traversal order. Every path listed under a fingerprint
/// has a node in `nodes` carrying that same fingerprint, and a path is listed
/// under at most one fingerprint, at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Canonical absolute path of the scan origin.
    pub root: PathBuf,

    /// Fingerprint to the paths that produced it, in traversal order.
    #[serde(rename = "fingerprints_to_paths")]
    pub fingerprints: IndexMap<Fingerprint, Vec<PathBuf>>,

    /// Every non-excluded entry encountered, directories included.
    #[serde(rename = "paths_to_nodes")]
    pub nodes: IndexMap<PathBuf, Node>,

    /// Non-fatal problems hit while scanning.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

impl Tree {
    /// Create an empty tree for a canonical root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Register a directory node. Returns `false` if the path is already known.
    pub fn insert_directory(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.path) {
            return false;
        }
        self.nodes.insert(node.path.clone(), node);
        true
    }

    /// Register a fingerprinted file node and index its path.
    ///
    /// Returns `false` without touching the tree if the node has no
    /// fingerprint or its path is already known.
    pub fn insert_file(&mut self, node: Node) -> bool {
        if node.fingerprint.is_empty() || self.nodes.contains_key(&node.path) {
            return false;
        }
        self.fingerprints
            .entry(node.fingerprint.clone())
            .or_default()
            .push(node.path.clone());
        self.nodes.insert(node.path.clone(), node);
        true
    }

    /// Record a non-fatal problem.
    ///
    /// A path that is not UTF-8 is stored in its lossy rendering.
    pub fn warn(&mut self, mut warning: ScanWarning) {
        if warning.path.to_str().is_none() {
            warning.path = PathBuf::from(warning.path.to_string_lossy().into_owned());
        }
        self.warnings.push(warning);
    }

    /// Look up a node by canonical path.
    pub fn get(&self, path: &Path) -> Option<&Node> {
        self.nodes.get(path)
    }

    /// Paths in this tree sharing a fingerprint.
    pub fn paths_for(&self, fingerprint: &Fingerprint) -> &[PathBuf] {
        self.fingerprints
            .get(fingerprint)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Path relative to this tree's root, if it lies under it.
    pub fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root).ok().map(Path::to_path_buf)
    }

    /// Number of fingerprinted files.
    pub fn file_count(&self) -> usize {
        self.fingerprints.values().map(Vec::len).sum()
    }

    /// Number of directories, the root included.
    pub fn dir_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_dir).count()
    }

    /// Total size of all fingerprinted files.
    pub fn total_size(&self) -> u64 {
        self.nodes
            .values()
            .filter(|n| n.is_file())
            .map(|n| n.size)
            .sum()
    }

    /// Number of files carrying a size-only fallback fingerprint.
    pub fn degraded_count(&self) -> usize {
        self.fingerprints
            .iter()
            .filter(|(print, _)| print.is_degraded())
            .map(|(_, paths)| paths.len())
            .sum()
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
