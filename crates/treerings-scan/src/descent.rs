//! Descent tracking for following linked directories.

use std::path::{Path, PathBuf};

/// Canonical roots of the walks currently in progress, outermost first.
///
/// A linked directory is only walked when its target is not already covered
/// by one of these walks, which bounds traversal even with cyclic links.
#[derive(Debug, Default)]
pub struct DescentStack {
    active: Vec<PathBuf>,
}

impl DescentStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { active: Vec::new() }
    }

    /// Enter a walk rooted at `dir`.
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.active.push(dir.into());
    }

    /// Leave the innermost walk.
    pub fn pop(&mut self) -> Option<PathBuf> {
        self.active.pop()
    }

    /// The active walk whose root is `path` or an ancestor of it.
    pub fn covering(&self, path: &Path) -> Option<&Path> {
        self.active
            .iter()
            .find(|root| path.starts_with(root))
            .map(PathBuf::as_path)
    }

    /// Number of nested walks.
    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Check if no walk is active.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covering_root_and_descendants() {
        let mut stack = DescentStack::new();
        stack.push("/data");

        assert_eq!(stack.covering(Path::new("/data")), Some(Path::new("/data")));
        assert_eq!(stack.covering(Path::new("/data/a/b")), Some(Path::new("/data")));
        assert_eq!(stack.covering(Path::new("/other")), None);
        // Component-wise, not string prefix
        assert_eq!(stack.covering(Path::new("/database")), None);
    }

    #[test]
    fn test_push_pop() {
        let mut stack = DescentStack::new();
        assert!(stack.is_empty());

        stack.push("/a");
        stack.push("/elsewhere/b");
        assert_eq!(stack.depth(), 2);
        assert!(stack.covering(Path::new("/elsewhere/b/c")).is_some());

        assert_eq!(stack.pop(), Some(PathBuf::from("/elsewhere/b")));
        assert!(stack.covering(Path::new("/elsewhere/b/c")).is_none());
        assert_eq!(stack.depth(), 1);
    }
}
