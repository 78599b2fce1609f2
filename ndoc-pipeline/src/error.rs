//! Pipeline errors.
//!
//! Every failure carries the [`Stage`] it happened in, so callers can map
//! it to a response without inspecting messages.

use ndoc_core::CodecError;
use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

/// Where in the pipeline an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Reading container bytes from a path or buffer.
    Source,
    /// Reading the key pointer and key.
    LocateKey,
    /// Restoring the archive signature.
    NormalizeHeader,
    /// XOR-ing the obfuscated region.
    Deobfuscate,
    /// Parsing the archive and extracting the entry.
    Extract,
    /// Skipping the sub-header and inflating the payload.
    Decode,
    /// Building a container from an archive.
    Seal,
    /// Calling a remote decode service.
    Remote,
}

impl Stage {
    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::LocateKey => "locate_key",
            Self::NormalizeHeader => "normalize_header",
            Self::Deobfuscate => "deobfuscate",
            Self::Extract => "extract",
            Self::Decode => "decode",
            Self::Seal => "seal",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error category, independent of stage and detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input shorter than a required offset or region.
    TruncatedInput,
    /// Bytes are not a usable archive.
    ArchiveFormat,
    /// The named entry is absent.
    EntryNotFound,
    /// Malformed or prematurely ending compressed data.
    Decompression,
    /// Underlying I/O failure.
    Io,
    /// The request was cancelled.
    Cancelled,
    /// A remote backend failed.
    Remote,
}

/// The error type for the decode pipeline.
#[derive(Debug, Error)]
pub enum NdocError {
    /// Input shorter than a required offset or region.
    #[error("Truncated input at {stage}: need {needed} bytes, have {available}")]
    TruncatedInput {
        /// Stage that needed the bytes.
        stage: Stage,
        /// Minimum length required.
        needed: usize,
        /// Length available.
        available: usize,
    },

    /// Bytes are not a usable archive.
    #[error("Archive format error at {stage}: {message}")]
    ArchiveFormat {
        /// Stage that rejected the archive.
        stage: Stage,
        /// Description of the problem.
        message: String,
        /// Underlying container error, if any.
        #[source]
        source: Option<CodecError>,
    },

    /// The named entry is absent.
    #[error("Entry not found: {name}")]
    EntryNotFound {
        /// Requested entry name.
        name: String,
    },

    /// Malformed or prematurely ending compressed data.
    #[error("Decompression failed at {stage}: {source}")]
    Decompression {
        /// Stage whose stream failed to decode.
        stage: Stage,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// Underlying I/O failure.
    #[error("I/O error at {stage}: {source}")]
    Io {
        /// Stage performing the I/O.
        stage: Stage,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The request was cancelled before `stage` started.
    #[error("Cancelled before {stage}")]
    Cancelled {
        /// Stage that did not run.
        stage: Stage,
    },

    /// A remote backend failed.
    #[error("Remote backend error: {message}")]
    Remote {
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, NdocError>;

impl NdocError {
    /// Create a truncated input error.
    pub fn truncated(stage: Stage, needed: usize, available: usize) -> Self {
        Self::TruncatedInput {
            stage,
            needed,
            available,
        }
    }

    /// Wrap a container error as an archive format error.
    pub fn archive(stage: Stage, source: CodecError) -> Self {
        Self::ArchiveFormat {
            stage,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create an archive format error with no underlying cause.
    pub fn archive_msg(stage: Stage, message: impl Into<String>) -> Self {
        Self::ArchiveFormat {
            stage,
            message: message.into(),
            source: None,
        }
    }

    /// Create an entry-not-found error.
    pub fn entry_not_found(name: impl Into<String>) -> Self {
        Self::EntryNotFound { name: name.into() }
    }

    /// Wrap a codec error as a decompression error.
    pub fn decompression(stage: Stage, source: CodecError) -> Self {
        Self::Decompression { stage, source }
    }

    /// Wrap an I/O error.
    pub fn io(stage: Stage, source: io::Error) -> Self {
        Self::Io { stage, source }
    }

    /// Create a cancellation error.
    pub fn cancelled(stage: Stage) -> Self {
        Self::Cancelled { stage }
    }

    /// Create a remote backend error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TruncatedInput { .. } => ErrorKind::TruncatedInput,
            Self::ArchiveFormat { .. } => ErrorKind::ArchiveFormat,
            Self::EntryNotFound { .. } => ErrorKind::EntryNotFound,
            Self::Decompression { .. } => ErrorKind::Decompression,
            Self::Io { .. } => ErrorKind::Io,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Remote { .. } => ErrorKind::Remote,
        }
    }

    /// Stage where the error occurred.
    pub fn stage(&self) -> Stage {
        match self {
            Self::TruncatedInput { stage, .. }
            | Self::ArchiveFormat { stage, .. }
            | Self::Decompression { stage, .. }
            | Self::Io { stage, .. }
            | Self::Cancelled { stage } => *stage,
            Self::EntryNotFound { .. } => Stage::Extract,
            Self::Remote { .. } => Stage::Remote,
        }
    }

    /// Whether the caller's input is at fault, as opposed to the
    /// environment (I/O, cancellation, remote service).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TruncatedInput
                | ErrorKind::ArchiveFormat
                | ErrorKind::EntryNotFound
                | ErrorKind::Decompression
        )
    }
}

// `io::Error` is not `Clone`; a copy keeps its kind and message.
impl Clone for NdocError {
    fn clone(&self) -> Self {
        match self {
            Self::TruncatedInput {
                stage,
                needed,
                available,
            } => Self::truncated(*stage, *needed, *available),
            Self::ArchiveFormat {
                stage,
                message,
                source,
            } => Self::ArchiveFormat {
                stage: *stage,
                message: message.clone(),
                source: source.clone(),
            },
            Self::EntryNotFound { name } => Self::entry_not_found(name.clone()),
            Self::Decompression { stage, source } => Self::decompression(*stage, source.clone()),
            Self::Io { stage, source } => Self::io(
                *stage,
                io::Error::new(source.kind(), source.to_string()),
            ),
            Self::Cancelled { stage } => Self::cancelled(*stage),
            Self::Remote { message } => Self::remote(message.clone()),
        }
    }
}
