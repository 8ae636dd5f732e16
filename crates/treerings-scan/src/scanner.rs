//! JWalk-based tree walker.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use jwalk::{Parallelism, WalkDir};
use rayon::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use treerings_core::{
    Fingerprint, Node, ScanConfig, ScanError, ScanWarning, Tree, WarningKind,
    millis_since_epoch,
};

use crate::descent::DescentStack;
use crate::fingerprint::fingerprint;
use crate::progress::{ProgressTracker, ScanProgress};

/// Files between progress broadcasts.
const PROGRESS_INTERVAL: u64 = 256;

/// Scanner that walks a root with jwalk and fingerprints every file.
///
/// Each root is walked serially in sorted order; independent roots can be
/// scanned in parallel with [`JwalkScanner::scan_all`].
pub struct JwalkScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl JwalkScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan one root.
    ///
    /// Fails only if the root cannot be resolved or stat'ed.
    pub fn scan(&self, config: &ScanConfig) -> Result<Tree, ScanError> {
        self.scan_inner(config, &[])
    }

    /// Scan one root, reusing fingerprints from an earlier scan of it.
    ///
    /// A prior node is reused when its path, size and modification time all
    /// match and its fingerprint is not the size-only fallback. The result is
    /// the same tree a cold scan would produce for unchanged files.
    pub fn scan_with_prior(
        &self,
        config: &ScanConfig,
        prior: Option<&Tree>,
    ) -> Result<Tree, ScanError> {
        match prior {
            Some(prior) => self.scan_inner(config, std::slice::from_ref(prior)),
            None => self.scan_inner(config, &[]),
        }
    }

    /// Scan several roots in parallel, one result per config in input order.
    ///
    /// `priors` may hold earlier trees for any of the roots; each is matched
    /// to its root by canonical path. The pool is sized by the first config's
    /// `threads`; other values are ignored.
    pub fn scan_all(
        &self,
        configs: &[ScanConfig],
        priors: &[Tree],
    ) -> Vec<Result<Tree, ScanError>> {
        let threads = configs.first().map(|c| c.threads).unwrap_or(0);
        if configs.iter().any(|c| c.threads != threads) {
            warn!("Roots ask for different thread counts, using {threads} for all");
        }
        let run = || {
            configs
                .par_iter()
                .map(|config| self.scan_inner(config, priors))
                .collect()
        };

        if threads == 0 {
            return run();
        }
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(run),
            Err(err) => {
                warn!("Couldn't build a {threads}-thread pool, using the default: {err}");
                run()
            }
        }
    }

    fn scan_inner(&self, config: &ScanConfig, priors: &[Tree]) -> Result<Tree, ScanError> {
        let start = Instant::now();
        if config.root.as_os_str().is_empty() {
            return Err(ScanError::InvalidConfig {
                message: "Tree root is empty".to_string(),
            });
        }

        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;
        if root_path.to_str().is_none() {
            return Err(ScanError::InvalidConfig {
                message: format!("Tree root is not valid UTF-8: {}", root_path.display()),
            });
        }
        let metadata = fs::metadata(&root_path).map_err(|e| ScanError::io(&root_path, e))?;
        let root_was_symlink = fs::symlink_metadata(&config.root)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

        info!("Scanning {} ...", root_path.display());

        let mut walk = Walk {
            config,
            prior: priors.iter().find(|t| t.root == root_path),
            tree: Tree::new(&root_path),
            stack: DescentStack::new(),
            progress: ProgressTracker::new(),
            progress_tx: &self.progress_tx,
        };

        let mut root = node_from_metadata(root_path.clone(), &metadata);
        root.was_symlink = root_was_symlink;
        if metadata.is_dir() {
            walk.progress.record_dir();
            walk.tree.insert_directory(root);
            walk.walk_dir(&root_path);
        } else {
            walk.visit_file(root);
        }

        let _ = self.progress_tx.send(walk.progress.snapshot());
        let tree = walk.tree;
        info!(
            "Scanned {}: {} files, {} directories, {} degraded, {} warnings in {:.2}s",
            tree.root.display(),
            tree.file_count(),
            tree.dir_count(),
            tree.degraded_count(),
            tree.warnings.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(tree)
    }
}

impl Default for JwalkScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// State of one root's scan.
struct Walk<'a> {
    config: &'a ScanConfig,
    prior: Option<&'a Tree>,
    tree: Tree,
    stack: DescentStack,
    progress: ProgressTracker,
    progress_tx: &'a broadcast::Sender<ScanProgress>,
}

impl Walk<'_> {
    /// Walk everything below `dir`, which is already registered.
    fn walk_dir(&mut self, dir: &Path) {
        self.stack.push(dir);

        // Links stay in so `resolve` can judge them by their target's name.
        let policy = self.config.clone();
        let walker = WalkDir::new(dir)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|entry| match entry {
                    Ok(e) => {
                        e.file_type().is_symlink()
                            || !policy.should_skip_hidden(&e.file_name().to_string_lossy())
                    }
                    Err(_) => true,
                });
                for e in children.iter_mut().flatten() {
                    if e.file_name().to_str().is_none() {
                        e.read_children_path = None;
                    }
                }
            });

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    self.warn(ScanWarning::new(path, err.to_string(), WarningKind::ReadError));
                    continue;
                }
            };

            let path = entry.path();
            let is_symlink = entry.file_type().is_symlink();
            if is_symlink && !self.config.follow_symlinks {
                trace!("Skipping symlink: {}", path.display());
                continue;
            }

            let Some(node) = self.resolve(&path, is_symlink) else {
                continue;
            };
            if node.skip {
                trace!("Skipping hidden entry: {}", node.path.display());
                continue;
            }

            if node.is_dir {
                self.visit_dir(&path, node);
            } else {
                self.visit_file(node);
            }
        }

        self.stack.pop();
    }

    /// Turn a visited path into a node.
    ///
    /// A link is followed to its canonical target, which becomes the node's
    /// identity. Hidden names are returned as skipped nodes without being
    /// stat'ed. Entries that can't be stat'ed, entries that are neither
    /// files nor directories, and paths that are not UTF-8 yield `None`.
    fn resolve(&mut self, path: &Path, is_symlink: bool) -> Option<Node> {
        let path = if is_symlink {
            self.resolve_link(path)?
        } else {
            path.to_path_buf()
        };
        if path.to_str().is_none() {
            self.warn(ScanWarning::invalid_name(&path));
            return None;
        }

        let skipped = Node::skipped(&path);
        if self.config.should_skip_hidden(&skipped.name) {
            return Some(Node {
                was_symlink: is_symlink,
                ..skipped
            });
        }

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(err) => {
                self.warn(ScanWarning::from_io(&path, &err, WarningKind::MetadataError));
                return None;
            }
        };
        if !metadata.is_dir() && !metadata.is_file() {
            trace!("Skipping special file: {}", path.display());
            return None;
        }

        let mut node = node_from_metadata(path, &metadata);
        node.was_symlink = is_symlink;
        Some(node)
    }

    /// Canonical target of a symbolic link.
    fn resolve_link(&mut self, link: &Path) -> Option<PathBuf> {
        let target = match fs::read_link(link) {
            Ok(t) => t,
            Err(err) => {
                self.warn(ScanWarning::from_io(link, &err, WarningKind::ReadError));
                return None;
            }
        };
        let target = match link.parent() {
            Some(parent) if target.is_relative() => parent.join(&target),
            _ => target,
        };

        match target.canonicalize() {
            Ok(resolved) => Some(resolved),
            Err(_) => {
                self.warn(ScanWarning::broken_symlink(link, &target));
                None
            }
        }
    }

    /// Register a directory; linked directories are walked as nested subtrees.
    fn visit_dir(&mut self, entry_path: &Path, node: Node) {
        if node.was_symlink {
            if let Some(active) = self.stack.covering(&node.path).map(Path::to_path_buf) {
                if entry_path.starts_with(&node.path) {
                    self.warn(ScanWarning::symlink_cycle(entry_path, &node.path));
                } else {
                    debug!(
                        "{} -> {} already covered by walk of {}",
                        entry_path.display(),
                        node.path.display(),
                        active.display()
                    );
                }
                return;
            }
        }

        self.progress.record_dir();
        let target = node.was_symlink.then(|| node.path.clone());
        if !self.tree.insert_directory(node) {
            return;
        }
        if let Some(target) = target {
            debug!("Following {} -> {}", entry_path.display(), target.display());
            self.walk_dir(&target);
        }
    }

    /// Fingerprint a file and index it.
    fn visit_file(&mut self, mut node: Node) {
        if self.tree.get(&node.path).is_some() {
            return;
        }

        let (bytes_sampled, degraded) = match self.cached_fingerprint(&node) {
            Some(print) => {
                trace!("Reusing fingerprint of unchanged {}", node.path.display());
                node.fingerprint = print;
                (0, false)
            }
            None => {
                let outcome = fingerprint(&node.path, node.size);
                if let Some(err) = &outcome.error {
                    self.record_warning(ScanWarning::degraded(&node.path, err));
                }
                let degraded = outcome.is_degraded();
                node.fingerprint = outcome.fingerprint;
                (outcome.bytes_sampled, degraded)
            }
        };

        let count = self
            .progress
            .record_file(node.path.clone(), bytes_sampled, degraded);
        self.tree.insert_file(node);

        if count % PROGRESS_INTERVAL == 0 {
            let _ = self.progress_tx.send(self.progress.snapshot());
        }
    }

    fn cached_fingerprint(&self, node: &Node) -> Option<Fingerprint> {
        let prior = self.prior?.get(&node.path)?;
        let unchanged = prior.is_file()
            && prior.size == node.size
            && prior.modified == node.modified
            && !prior.fingerprint.is_empty()
            && !prior.fingerprint.is_degraded();
        unchanged.then(|| prior.fingerprint.clone())
    }

    /// Log and keep a warning.
    fn warn(&mut self, warning: ScanWarning) {
        warn!("{}: {}", warning.path.display(), warning.message);
        self.record_warning(warning);
    }

    /// Keep a warning that was already logged.
    fn record_warning(&mut self, warning: ScanWarning) {
        self.progress.record_error();
        self.tree.warn(warning);
    }
}

fn node_from_metadata(path: PathBuf, metadata: &fs::Metadata) -> Node {
    let modified = metadata.modified().map(millis_since_epoch).unwrap_or(0);
    if metadata.is_dir() {
        Node::new_directory(path, modified)
    } else {
        Node::new_file(path, metadata.len(), modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "hello").unwrap();

        temp
    }

    #[test]
    fn test_basic_scan() {
        let temp = create_test_tree();
        let tree = JwalkScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();

        assert_eq!(tree.root, temp.path().canonicalize().unwrap());
        assert_eq!(tree.file_count(), 4);
        // root, dir1, dir1/subdir, dir2
        assert_eq!(tree.dir_count(), 4);
        assert_eq!(tree.fingerprints.len(), 3);
        assert!(!tree.has_warnings());
    }

    #[test]
    fn test_equal_content_shares_fingerprint() {
        let temp = create_test_tree();
        let tree = JwalkScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();

        let a = &tree.get(&tree.root.join("file1.txt")).unwrap().fingerprint;
        let paths = tree.paths_for(a);
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&tree.root.join("dir2/file4.txt")));
    }

    #[test]
    fn test_index_invariant() {
        let temp = create_test_tree();
        let tree = JwalkScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();

        for (print, paths) in &tree.fingerprints {
            for path in paths {
                assert_eq!(&tree.get(path).unwrap().fingerprint, print);
            }
        }
        for node in tree.nodes.values() {
            assert_eq!(node.fingerprint.is_empty(), node.is_dir);
        }
    }

    #[test]
    fn test_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let result = JwalkScanner::new().scan(&ScanConfig::new(temp.path().join("nope")));
        assert!(matches!(result, Err(ScanError::NotFound { .. })));
    }

    #[test]
    fn test_empty_root_rejected() {
        let result = JwalkScanner::new().scan(&ScanConfig::new(""));
        assert!(matches!(result, Err(ScanError::InvalidConfig { .. })));
    }

    #[test]
    fn test_file_root() {
        let temp = create_test_tree();
        let file = temp.path().join("file1.txt");
        let tree = JwalkScanner::new().scan(&ScanConfig::new(&file)).unwrap();

        assert_eq!(tree.file_count(), 1);
        assert!(tree.get(&file.canonicalize().unwrap()).is_some());
    }

    #[test]
    fn test_cached_fingerprint_reused_only_when_unchanged() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());
        let scanner = JwalkScanner::new();
        let cold = scanner.scan(&config).unwrap();
        let file = cold.root.join("file1.txt");

        // Plant a marker to prove the prior is consulted
        let mut prior = cold.clone();
        prior.nodes.get_mut(&file).unwrap().fingerprint = Fingerprint::from("cafe");
        let warm = scanner.scan_with_prior(&config, Some(&prior)).unwrap();
        assert_eq!(warm.get(&file).unwrap().fingerprint.as_str(), "cafe");

        // A different mtime forces a fresh fingerprint
        let mut stale = prior.clone();
        stale.nodes.get_mut(&file).unwrap().modified -= 1;
        let rescanned = scanner.scan_with_prior(&config, Some(&stale)).unwrap();
        assert_eq!(
            rescanned.get(&file).unwrap().fingerprint,
            cold.get(&file).unwrap().fingerprint
        );
    }

    #[test]
    fn test_vanished_file_degrades_to_size() {
        let temp = TempDir::new().unwrap();
        let config = ScanConfig::new(temp.path());
        let scanner = JwalkScanner::new();
        let mut walk = Walk {
            config: &config,
            prior: None,
            tree: Tree::new(temp.path()),
            stack: DescentStack::new(),
            progress: ProgressTracker::new(),
            progress_tx: &scanner.progress_tx,
        };

        // Listed by the walk, gone by the time it is opened
        let gone = temp.path().join("gone.bin");
        walk.visit_file(Node::new_file(&gone, 42, 0));

        let node = walk.tree.get(&gone).unwrap();
        assert_eq!(node.fingerprint.as_str(), "size:42");
        assert_eq!(walk.tree.degraded_count(), 1);
        assert_eq!(walk.tree.warnings.len(), 1);
        assert_eq!(walk.tree.warnings[0].path, gone);
        assert_eq!(walk.tree.warnings[0].kind, WarningKind::ReadError);
        assert_eq!(walk.progress.snapshot().errors_count, 1);
    }

    #[test]
    fn test_progress_final_snapshot() {
        let temp = create_test_tree();
        let scanner = JwalkScanner::new();
        let mut rx = scanner.subscribe();
        scanner.scan(&ScanConfig::new(temp.path())).unwrap();

        let mut last = None;
        while let Ok(progress) = rx.try_recv() {
            last = Some(progress);
        }
        let last = last.unwrap();
        assert_eq!(last.files_scanned, 4);
        assert_eq!(last.dirs_scanned, 4);
    }
}
