//! JSON persistence of an [`Analysis`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::analysis::Analysis;
use crate::error::AnalyzeError;

impl Analysis {
    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, AnalyzeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON produced by [`Analysis::to_json`] or [`Analysis::save`].
    pub fn from_json(json: &str) -> Result<Self, AnalyzeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the analysis to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AnalyzeError> {
        let path = path.as_ref();
        let io_err = |source| AnalyzeError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(io_err)?;

        info!("Saved analysis of {} trees to {}", self.trees.len(), path.display());
        Ok(())
    }

    /// Read an analysis previously written by [`Analysis::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalyzeError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| AnalyzeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_missing_file() {
        let err = Analysis::load("/definitely/not/here.json").unwrap_err();
        match err {
            AnalyzeError::Io { path, .. } => assert_eq!(path, PathBuf::from("/definitely/not/here.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Analysis::from_json("{\"trees\": 7}"),
            Err(AnalyzeError::Json(_))
        ));
    }
}
