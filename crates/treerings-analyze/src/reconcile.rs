//! Multi-tree reconciliation.
//!
//! Trees are folded in order into one fingerprint -> paths accumulator:
//! 1. A fingerprint a tree brings that no earlier tree had is "missing" for
//!    that tree, recorded once by its first path relative to the tree root
//! 2. Every path is added to the accumulator, so later trees are compared
//!    against all earlier trees together, not just the baseline
//! 3. Once folded, fingerprints seen once are unique and the rest are
//!    duplicate groups
//!
//! Classification depends only on how many paths a fingerprint collected.

use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use tracing::{info, warn};

use treerings_core::{Fingerprint, Tree};

use crate::analysis::Analysis;
use crate::error::AnalyzeError;

/// Reconcile `trees`, the first being the baseline.
///
/// Fails only when a tree's indices disagree with each other.
pub fn analyze(trees: Vec<Tree>) -> Result<Analysis, AnalyzeError> {
    info!("Analyzing {} trees ...", trees.len());

    let mut seen: IndexMap<Fingerprint, Vec<PathBuf>> = IndexMap::new();
    let mut missing: IndexMap<PathBuf, Vec<PathBuf>> = IndexMap::new();

    for (index, tree) in trees.iter().enumerate() {
        check_consistency(tree)?;

        let mut novel = Vec::new();
        for (print, paths) in &tree.fingerprints {
            let earlier = seen.entry(print.clone()).or_default();
            if index > 0 && earlier.is_empty() {
                novel.push(relative_to(&tree.root, &paths[0]));
            }
            earlier.extend(paths.iter().cloned());
        }

        if !novel.is_empty() {
            missing.insert(tree.root.clone(), novel);
        }
    }

    let mut unique = Vec::new();
    let mut duplicates = IndexMap::new();
    for (print, mut paths) in seen {
        if paths.len() == 1 {
            unique.append(&mut paths);
        } else {
            duplicates.insert(print, paths);
        }
    }

    let analysis = Analysis {
        trees,
        duplicates,
        unique,
        missing,
    };
    info!(
        "{} unique, {} duplicate groups, {} missing",
        analysis.unique.len(),
        analysis.duplicates.len(),
        analysis.missing_count()
    );
    Ok(analysis)
}

/// Every indexed path must be a node carrying the fingerprint it is indexed under.
fn check_consistency(tree: &Tree) -> Result<(), AnalyzeError> {
    let inconsistent = |print: &Fingerprint, path: &Path, reason| AnalyzeError::Inconsistent {
        root: tree.root.clone(),
        fingerprint: print.clone(),
        path: path.to_path_buf(),
        reason,
    };

    for (print, paths) in &tree.fingerprints {
        if paths.is_empty() {
            return Err(inconsistent(print, &tree.root, "no paths"));
        }
        for path in paths {
            match tree.get(path) {
                None => return Err(inconsistent(print, path, "no node")),
                Some(node) if &node.fingerprint != print => {
                    return Err(inconsistent(print, path, "node has another fingerprint"));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// `path` relative to `root`.
///
/// Paths reached through a link to outside the root keep their absolute
/// layout with the root component dropped, so they still land below a
/// backup destination.
pub(crate) fn relative_to(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => {
            warn!(
                "{} is outside {}, keeping its absolute layout",
                path.display(),
                root.display()
            );
            path.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treerings_core::Node;

    fn tree(root: &str, files: &[(&str, &str)]) -> Tree {
        let mut tree = Tree::new(root);
        tree.insert_directory(Node::new_directory(root, 0));
        for (path, print) in files {
            let mut node = Node::new_file(*path, 1, 0);
            node.fingerprint = Fingerprint::from(*print);
            tree.insert_file(node);
        }
        tree
    }

    #[test]
    fn test_baseline_never_missing() {
        let analysis = analyze(vec![tree("/a", &[("/a/x", "h1")])]).unwrap();
        assert!(analysis.missing.is_empty());
        assert!(analysis.missing_for(Path::new("/a")).is_empty());
        assert_eq!(analysis.unique, vec![PathBuf::from("/a/x")]);
    }

    #[test]
    fn test_missing_is_cumulative() {
        let analysis = analyze(vec![
            tree("/a", &[("/a/x", "h1")]),
            tree("/b", &[("/b/y", "h2")]),
            tree("/c", &[("/c/z", "h2"), ("/c/w", "h3")]),
        ])
        .unwrap();

        assert_eq!(analysis.missing_for(Path::new("/b")), &[PathBuf::from("y")]);
        // h2 arrived with /b already, so only h3 is new in /c
        assert_eq!(analysis.missing_for(Path::new("/c")), &[PathBuf::from("w")]);
    }

    #[test]
    fn test_in_tree_duplicates_reported_missing_once() {
        let analysis = analyze(vec![
            tree("/a", &[]),
            tree("/b", &[("/b/one", "h1"), ("/b/two", "h1")]),
        ])
        .unwrap();

        assert_eq!(analysis.missing_for(Path::new("/b")), &[PathBuf::from("one")]);
        assert_eq!(analysis.duplicates[&Fingerprint::from("h1")].len(), 2);
    }

    #[test]
    fn test_inconsistent_tree_rejected() {
        let mut broken = tree("/a", &[("/a/x", "h1")]);
        broken
            .fingerprints
            .get_mut(&Fingerprint::from("h1"))
            .unwrap()
            .push(PathBuf::from("/a/ghost"));

        let err = analyze(vec![broken]).unwrap_err();
        assert!(matches!(err, AnalyzeError::Inconsistent { reason: "no node", .. }));
    }

    #[test]
    fn test_mismatched_node_fingerprint_rejected() {
        let mut broken = tree("/a", &[("/a/x", "h1")]);
        broken.nodes.get_mut(Path::new("/a/x")).unwrap().fingerprint = Fingerprint::from("h9");

        assert!(matches!(
            analyze(vec![broken]),
            Err(AnalyzeError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_relative_to_outside_root() {
        assert_eq!(
            relative_to(Path::new("/a"), Path::new("/a/b/c.txt")),
            PathBuf::from("b/c.txt")
        );
        assert_eq!(
            relative_to(Path::new("/a"), Path::new("/elsewhere/c.txt")),
            PathBuf::from("elsewhere/c.txt")
        );
    }

    #[test]
    fn test_empty_input() {
        let analysis = analyze(Vec::new()).unwrap();
        assert!(analysis.unique.is_empty());
        assert!(analysis.duplicates.is_empty());
        assert!(analysis.baseline().is_none());
    }
}
