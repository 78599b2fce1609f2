//! Per-request scratch space.
//!
//! Each request gets its own uniquely named temporary directory. Stage
//! output is written there and read back before the next stage runs. The
//! directory is removed when the [`Scratch`] is dropped, whether the
//! request succeeded, failed or was abandoned.

use crate::error::{NdocError, Result, Stage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

/// Prefix of every scratch directory name.
pub const SCRATCH_PREFIX: &str = "ndoc-";

/// A request's private scratch directory.
#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Create a scratch directory under `parent`, or the system temp
    /// directory when `None`.
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| NdocError::io(Stage::Source, e))?;
        Ok(Self { dir })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// File holding the output of `stage`.
    pub fn artifact_path(&self, stage: Stage) -> PathBuf {
        self.dir.path().join(format!("{}.bin", stage.name()))
    }

    /// Write `bytes` as the output of `stage` and flush them to disk.
    pub async fn commit(&self, stage: Stage, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.artifact_path(stage);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| NdocError::io(stage, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| NdocError::io(stage, e))?;
        file.sync_all().await.map_err(|e| NdocError::io(stage, e))?;
        Ok(path)
    }

    /// Read back the committed output of `stage`.
    pub async fn load(&self, stage: Stage) -> Result<Vec<u8>> {
        tokio::fs::read(self.artifact_path(stage))
            .await
            .map_err(|e| NdocError::io(stage, e))
    }

    /// Remove the directory now, reporting failures.
    pub fn close(self) -> Result<()> {
        self.dir
            .close()
            .map_err(|e| NdocError::io(Stage::Decode, e))
    }
}
