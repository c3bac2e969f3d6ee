// src/host/scratch.rs

//! Temporary build directories

use crate::error::{Error, Result};
use crate::host::{ScratchArea, ScratchProvider};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Prefix for build directories created under the temp root
const SCRATCH_PREFIX: &str = "aur_build_";

/// Hands out temporary directories that are removed on drop
#[derive(Debug, Default)]
pub struct TempScratch {
    /// Parent directory (system temp dir if unset)
    base: Option<PathBuf>,
}

impl TempScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create scratch areas under `base` instead of the system temp dir
    pub fn in_dir(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }
}

/// A temporary directory owned by one execution run
#[derive(Debug)]
struct TempScratchArea {
    dir: TempDir,
}

impl ScratchArea for TempScratchArea {
    fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for TempScratchArea {
    fn drop(&mut self) {
        debug!("Reclaiming scratch area {}", self.dir.path().display());
    }
}

impl ScratchProvider for TempScratch {
    fn acquire(&self) -> Result<Box<dyn ScratchArea>> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);

        let dir = match &self.base {
            Some(base) => builder.tempdir_in(base),
            None => builder.tempdir(),
        }
        .map_err(|e| Error::IoError(format!("Failed to create scratch directory: {}", e)))?;

        debug!("Acquired scratch area {}", dir.path().display());
        Ok(Box::new(TempScratchArea { dir }))
    }
}
