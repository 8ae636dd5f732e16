//! Collision-free destination naming.

use std::path::{Path, PathBuf};

/// Highest numbered suffix tried before giving up on a destination.
pub const MAX_SUFFIX: u32 = 10_000;

/// The `n`th alternative name for `path`: `name.ext` becomes `name-n.ext`.
///
/// Only the last extension moves behind the number, so `a.tar.gz` becomes
/// `a.tar-1.gz`. Names without an extension, dotfiles included, get the
/// number appended: `.profile` becomes `.profile-1`.
pub fn numbered_path(path: &Path, n: u32) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{n}"),
    };
    path.with_file_name(name)
}

/// Candidate destinations in probing order: `path` itself, then
/// `name-1.ext`, `name-2.ext`, ... up to [`MAX_SUFFIX`].
pub fn candidates(path: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    std::iter::once(path.to_path_buf()).chain((1..=MAX_SUFFIX).map(|n| numbered_path(path, n)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_path() {
        assert_eq!(
            numbered_path(Path::new("/base/docs/report.pdf"), 1),
            PathBuf::from("/base/docs/report-1.pdf")
        );
        assert_eq!(
            numbered_path(Path::new("/base/docs/report.pdf"), 12),
            PathBuf::from("/base/docs/report-12.pdf")
        );
    }

    #[test]
    fn test_numbered_path_without_extension() {
        assert_eq!(numbered_path(Path::new("/base/Makefile"), 2), PathBuf::from("/base/Makefile-2"));
        assert_eq!(numbered_path(Path::new("/base/.profile"), 1), PathBuf::from("/base/.profile-1"));
    }

    #[test]
    fn test_numbered_path_double_extension() {
        assert_eq!(numbered_path(Path::new("a.tar.gz"), 1), PathBuf::from("a.tar-1.gz"));
    }

    #[test]
    fn test_candidates_start_with_original() {
        let mut it = candidates(Path::new("/b/x.txt"));
        assert_eq!(it.next(), Some(PathBuf::from("/b/x.txt")));
        assert_eq!(it.next(), Some(PathBuf::from("/b/x-1.txt")));
        assert_eq!(it.next(), Some(PathBuf::from("/b/x-2.txt")));
        assert_eq!(candidates(Path::new("/b/x.txt")).count(), MAX_SUFFIX as usize + 1);
    }
}
