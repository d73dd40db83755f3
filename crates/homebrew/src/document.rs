//! The formula file held in memory.

use brewbump_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Text of a formula file plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaDocument {
    path: PathBuf,
    content: String,
}

impl FormulaDocument {
    /// Wrap already-loaded text.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Read a formula from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::file_io(path, "read", e))?;
        Ok(Self::new(path, content))
    }

    /// Where the formula lives.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The formula text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}
