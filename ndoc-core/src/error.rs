//! Error types for codec and container operations.
//!
//! [`CodecError`] covers everything below the pipeline layer: I/O on the
//! underlying reader, malformed ZIP structures, and malformed DEFLATE data.
//! The pipeline crate maps these into its own stage-aware taxonomy.

use std::io;
use thiserror::Error;

/// The error type for bit-level, codec, and container operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error from the underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic number in a header.
    #[error("Invalid magic number: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual magic bytes found.
        found: Vec<u8>,
    },

    /// Unsupported compression method.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The compression method identifier.
        method: String,
    },

    /// Checksum mismatch (CRC-32 for ZIP members, Adler-32 for zlib streams).
    #[error("{algorithm} mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Name of the checksum algorithm.
        algorithm: &'static str,
        /// Checksum stored in the container.
        expected: u32,
        /// Checksum computed over the data.
        computed: u32,
    },

    /// Invalid Huffman code encountered during decompression.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code was found.
        bit_position: u64,
    },

    /// Corrupted data.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid header format.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Input ended before the structure being read was complete.
    #[error("Unexpected end of input: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },

    /// Back-reference reaches before the start of the output.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Bytes of history available.
        history_size: usize,
    },

    /// Decompressed output grew past the configured limit.
    #[error("Decompressed output exceeds limit of {limit} bytes")]
    OutputLimitExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// Entry not found in archive.
    #[error("Entry not found: {name}")]
    EntryNotFound {
        /// Name of the missing entry.
        name: String,
    },
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Create an invalid magic error.
    pub fn invalid_magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create a CRC-32 mismatch error.
    pub fn crc_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch {
            algorithm: "CRC-32",
            expected,
            computed,
        }
    }

    /// Create an Adler-32 mismatch error.
    pub fn adler_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch {
            algorithm: "Adler-32",
            expected,
            computed,
        }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create an output limit error.
    pub fn output_limit(limit: usize) -> Self {
        Self::OutputLimitExceeded { limit }
    }

    /// Create an entry not found error.
    pub fn entry_not_found(name: impl Into<String>) -> Self {
        Self::EntryNotFound { name: name.into() }
    }

    /// Whether the error was caused by the input ending early, either as
    /// a codec-level EOF or a short read on the underlying reader.
    pub fn is_truncation(&self) -> bool {
        match self {
            Self::UnexpectedEof { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

// `io::Error` is not `Clone`; a copy keeps its kind and message.
impl Clone for CodecError {
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
            Self::InvalidMagic { expected, found } => Self::InvalidMagic {
                expected: expected.clone(),
                found: found.clone(),
            },
            Self::UnsupportedMethod { method } => Self::UnsupportedMethod {
                method: method.clone(),
            },
            Self::ChecksumMismatch {
                algorithm,
                expected,
                computed,
            } => Self::ChecksumMismatch {
                algorithm: *algorithm,
                expected: *expected,
                computed: *computed,
            },
            Self::InvalidHuffmanCode { bit_position } => Self::InvalidHuffmanCode {
                bit_position: *bit_position,
            },
            Self::CorruptedData { offset, message } => Self::CorruptedData {
                offset: *offset,
                message: message.clone(),
            },
            Self::InvalidHeader { message } => Self::InvalidHeader {
                message: message.clone(),
            },
            Self::UnexpectedEof { expected } => Self::UnexpectedEof {
                expected: *expected,
            },
            Self::InvalidDistance {
                distance,
                history_size,
            } => Self::InvalidDistance {
                distance: *distance,
                history_size: *history_size,
            },
            Self::OutputLimitExceeded { limit } => Self::OutputLimitExceeded { limit: *limit },
            Self::EntryNotFound { name } => Self::EntryNotFound { name: name.clone() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::invalid_magic(vec![0x50, 0x4B, 0x03, 0x04], vec![0x4E, 0x44]);
        assert!(err.to_string().contains("Invalid magic"));

        let err = CodecError::crc_mismatch(0x12345678, 0xDEADBEEF);
        assert!(err.to_string().contains("CRC-32 mismatch"));
        assert!(err.to_string().contains("0x12345678"));

        let err = CodecError::adler_mismatch(1, 2);
        assert!(err.to_string().starts_with("Adler-32"));

        let err = CodecError::unsupported_method("LZMA");
        assert!(err.to_string().contains("LZMA"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: CodecError = io_err.into();
        assert!(matches!(err, CodecError::Io(_)));
        assert!(!err.is_truncation());
    }

    #[test]
    fn test_truncation_classification() {
        assert!(CodecError::unexpected_eof(4).is_truncation());
        let short_read: CodecError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(short_read.is_truncation());
        assert!(!CodecError::corrupted(0, "bad").is_truncation());
    }

    #[test]
    fn test_clone_keeps_io_kind() {
        let err: CodecError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        let copy = err.clone();
        assert!(copy.is_truncation());
        assert_eq!(copy.to_string(), err.to_string());
    }
}
