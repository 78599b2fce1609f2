//! Where container bytes come from.

use crate::error::{NdocError, Result, Stage};
use std::fmt;
use std::path::{Path, PathBuf};

/// Container input: a file on disk or bytes already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteSource {
    /// Read the file at this path.
    Path(PathBuf),
    /// Use these bytes.
    Buffer(Vec<u8>),
}

impl ByteSource {
    /// Load the bytes. Buffers are moved out without copying.
    pub async fn read(self) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| NdocError::io(Stage::Source, e)),
            Self::Buffer(bytes) => Ok(bytes),
        }
    }

    /// Path of a file source.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Buffer(_) => None,
        }
    }
}

impl From<PathBuf> for ByteSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ByteSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(bytes)
    }
}

impl From<&[u8]> for ByteSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Buffer(bytes.to_vec())
    }
}

impl fmt::Display for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Buffer(bytes) => write!(f, "<{} byte buffer>", bytes.len()),
        }
    }
}
