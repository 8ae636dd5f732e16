//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for scanning one root.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Include hidden entries (names starting with `.`).
    #[builder(default = "false")]
    #[serde(default)]
    pub include_hidden: bool,

    /// Follow symbolic links, descending into linked directories.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub follow_symlinks: bool,

    /// Number of threads for multi-root scanning (0 = auto-detect).
    ///
    /// A batch of roots shares one pool, so `JwalkScanner::scan_all` only
    /// reads this from the first config of the batch.
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_hidden: false,
            follow_symlinks: true,
            threads: 0,
        }
    }

    /// Same settings, different root.
    pub fn with_root(&self, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..self.clone()
        }
    }

    /// Check if an entry with this name is excluded by the hidden-entry policy.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.') && name != "." && name != ".."
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .root("/home/user")
            .threads(4usize)
            .include_hidden(true)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert_eq!(config.threads, 4);
        assert!(config.include_hidden);
        assert!(config.follow_symlinks);
    }

    #[test]
    fn test_config_builder_rejects_empty_root() {
        assert!(ScanConfig::builder().root("").build().is_err());
        assert!(ScanConfig::builder().build().is_err());
    }

    #[test]
    fn test_config_simple() {
        let config = ScanConfig::new("/home/user");
        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert!(!config.include_hidden);
        assert!(config.follow_symlinks);
        assert_eq!(config.threads, 0);
    }

    #[test]
    fn test_with_root_keeps_policy() {
        let mut config = ScanConfig::new("/a");
        config.include_hidden = true;
        let other = config.with_root("/b");
        assert_eq!(other.root, PathBuf::from("/b"));
        assert!(other.include_hidden);
    }

    #[test]
    fn test_should_skip_hidden() {
        let mut config = ScanConfig::new("/test");

        // Hidden entries are excluded by default
        assert!(config.should_skip_hidden(".git"));
        assert!(!config.should_skip_hidden("src"));
        assert!(!config.should_skip_hidden("."));
        assert!(!config.should_skip_hidden(".."));

        config.include_hidden = true;
        assert!(!config.should_skip_hidden(".git"));
    }

    #[test]
    fn test_serde_defaults() {
        let config: ScanConfig = serde_json::from_str(r#"{"root":"/x"}"#).unwrap();
        assert!(!config.include_hidden);
        assert!(config.follow_symlinks);
    }
}
