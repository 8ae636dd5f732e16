//! The reconciled view of several trees.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use treerings_core::{Fingerprint, Tree};

/// Reconciliation of an ordered sequence of trees.
///
/// `trees[0]` is the baseline. `unique` and the `duplicates` lists follow
/// traversal order; treat them as sets, or use [`Analysis::sorted_unique`]
/// and [`Analysis::sorted_duplicates`] for stable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// The reconciled trees, baseline first.
    pub trees: Vec<Tree>,

    /// Fingerprints seen at least twice, with every path across all trees.
    pub duplicates: IndexMap<Fingerprint, Vec<PathBuf>>,

    /// Paths whose fingerprint was seen exactly once.
    pub unique: Vec<PathBuf>,

    /// Per tree root, root-relative paths whose fingerprint no earlier tree
    /// had. Roots with nothing novel are absent.
    pub missing: IndexMap<PathBuf, Vec<PathBuf>>,
}

impl Analysis {
    /// The tree everything else is measured against.
    pub fn baseline(&self) -> Option<&Tree> {
        self.trees.first()
    }

    /// Novel paths for a tree root; empty for the baseline.
    pub fn missing_for(&self, root: &Path) -> &[PathBuf] {
        self.missing.get(root).map(Vec::as_slice).unwrap_or_default()
    }

    /// Total number of missing files across all trees.
    pub fn missing_count(&self) -> usize {
        self.missing.values().map(Vec::len).sum()
    }

    /// Number of paths that belong to a duplicate group.
    pub fn duplicate_file_count(&self) -> usize {
        self.duplicates.values().map(Vec::len).sum()
    }

    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    /// Unique paths in lexicographic order.
    pub fn sorted_unique(&self) -> Vec<PathBuf> {
        let mut unique = self.unique.clone();
        unique.sort();
        unique
    }

    /// Duplicate groups ordered by fingerprint, each with sorted paths.
    pub fn sorted_duplicates(&self) -> Vec<(Fingerprint, Vec<PathBuf>)> {
        let mut groups: Vec<_> = self
            .duplicates
            .iter()
            .map(|(print, paths)| {
                let mut paths = paths.clone();
                paths.sort();
                (print.clone(), paths)
            })
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups
    }

    /// Headline counts.
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            trees: self.trees.len(),
            unique_files: self.unique.len(),
            duplicate_groups: self.duplicates.len(),
            duplicate_files: self.duplicate_file_count(),
            missing_files: self.missing_count(),
            degraded_files: self.trees.iter().map(Tree::degraded_count).sum(),
            warnings: self.trees.iter().map(|t| t.warnings.len()).sum(),
        }
    }
}

/// Headline counts of an analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Number of trees reconciled.
    pub trees: usize,
    /// Files whose fingerprint occurs once.
    pub unique_files: usize,
    /// Distinct fingerprints occurring more than once.
    pub duplicate_groups: usize,
    /// Files belonging to a duplicate group.
    pub duplicate_files: usize,
    /// Files novel relative to the trees before them.
    pub missing_files: usize,
    /// Files fingerprinted by size only.
    pub degraded_files: usize,
    /// Scan warnings across all trees.
    pub warnings: usize,
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "======== ANALYSIS ========")?;
        writeln!(f)?;
        writeln!(f, "  Trees: {}", self.trees)?;
        writeln!(f, "  Unique files: {}", self.unique_files)?;
        writeln!(
            f,
            "  Duplicated files: {} ({} groups)",
            self.duplicate_files, self.duplicate_groups
        )?;
        writeln!(f, "  Missing* files: {}", self.missing_files)?;
        if self.degraded_files > 0 {
            writeln!(f, "  Fingerprinted by size only: {}", self.degraded_files)?;
        }
        if self.warnings > 0 {
            writeln!(f, "  Scan warnings: {}", self.warnings)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "  *files not found in first tree, but present in one or more subsequent trees."
        )?;
        writeln!(f)?;
        write!(f, "==========================")
    }
}
