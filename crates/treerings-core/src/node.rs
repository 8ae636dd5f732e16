//! File and directory node types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Sampled content fingerprint of a file, as a string.
///
/// Normally the lowercase hex of a 160-bit digest. A file that could not be
/// opened gets the degraded form `size:<bytes>`, which collides for every
/// unreadable file of the same size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(CompactString);

impl Fingerprint {
    /// Prefix of size-only fallback fingerprints.
    pub const DEGRADED_PREFIX: &'static str = "size:";

    /// Wrap an existing fingerprint string.
    pub fn new(value: impl Into<CompactString>) -> Self {
        Self(value.into())
    }

    /// Hex-encode raw digest bytes.
    pub fn from_digest(bytes: &[u8]) -> Self {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex.into())
    }

    /// Size-only fallback for files whose content can't be read.
    pub fn from_size(size: u64) -> Self {
        Self(compact_str::format_compact!("{}{size}", Self::DEGRADED_PREFIX))
    }

    /// Get the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Directories and excluded entries carry an empty fingerprint.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this is a size-only fallback.
    pub fn is_degraded(&self) -> bool {
        self.0.starts_with(Self::DEGRADED_PREFIX)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One filesystem entry observed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Base name of the entry.
    pub name: CompactString,

    /// Whether the entry is a directory.
    pub is_dir: bool,

    /// Canonical absolute path, the node's identity within a tree.
    pub path: PathBuf,

    /// Content fingerprint; empty for directories and excluded entries.
    #[serde(rename = "print", default)]
    pub fingerprint: Fingerprint,

    /// Size in bytes (0 for directories).
    pub size: u64,

    /// Last modification, milliseconds since the Unix epoch.
    pub modified: i64,

    /// Resolved from a symbolic link.
    #[serde(skip)]
    pub was_symlink: bool,

    /// Excluded by policy; directories are not descended.
    #[serde(skip)]
    pub skip: bool,
}

impl Node {
    /// Create a file node without a fingerprint.
    pub fn new_file(path: impl Into<PathBuf>, size: u64, modified: i64) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            is_dir: false,
            path,
            fingerprint: Fingerprint::default(),
            size,
            modified,
            was_symlink: false,
            skip: false,
        }
    }

    /// Create a directory node.
    pub fn new_directory(path: impl Into<PathBuf>, modified: i64) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            is_dir: true,
            path,
            fingerprint: Fingerprint::default(),
            size: 0,
            modified,
            was_symlink: false,
            skip: false,
        }
    }

    /// Create a node excluded by policy before it was stat'ed.
    pub fn skipped(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            is_dir: false,
            path,
            fingerprint: Fingerprint::default(),
            size: 0,
            modified: 0,
            was_symlink: false,
            skip: true,
        }
    }

    /// Check if this node is a regular file.
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    /// Modification time as a UTC timestamp.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.modified)
    }
}

/// Milliseconds since the Unix epoch for a filesystem timestamp.
pub fn millis_since_epoch(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}

fn base_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}
