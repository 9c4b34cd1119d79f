//! Scratch directories for service data and logs

use crate::domain::ports::{ScratchDir, TempDirProvider};
use crate::domain::DomainError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

impl ScratchDir for TempDir {
    fn path(&self) -> &Path {
        TempDir::path(self)
    }
}

/// Creates `tempfile` directories. Each one is removed when its guard drops.
#[derive(Debug, Clone, Default)]
pub struct TempDirFactory {
    root: Option<PathBuf>,
}

impl TempDirFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create directories under `root` instead of the system temp dir.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl TempDirProvider for TempDirFactory {
    fn create(&self, prefix: &str) -> Result<Box<dyn ScratchDir>, DomainError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| DomainError::io(format!("creating {prefix}* directory"), e))?;

        debug!(path = %dir.path().display(), "Created scratch directory");
        Ok(Box::new(dir))
    }
}
