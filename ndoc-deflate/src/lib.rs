//! # ndoc-deflate
//!
//! Pure Rust DEFLATE (RFC 1951) decompression with zlib (RFC 1950)
//! unwrapping, used for ZIP members and for the document payload inside
//! them.
//!
//! ## Features
//!
//! - **Decompression**: all DEFLATE block types
//!   - Stored (uncompressed) blocks
//!   - Fixed Huffman codes
//!   - Dynamic Huffman codes
//! - **Output limit**: decoding fails once output passes a caller-chosen cap
//! - **Stored encoding**: [`deflate_stored`] for building test fixtures and
//!   archives without a compressor
//!
//! ## Example
//!
//! ```rust
//! use ndoc_deflate::{deflate_stored, inflate};
//!
//! let original = b"Hello, World!";
//! let encoded = deflate_stored(original);
//! assert_eq!(inflate(&encoded).unwrap(), original);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod huffman;
pub mod inflate;
pub mod stored;
pub mod tables;
pub mod zlib;

use ndoc_core::error::{CodecError, Result};

// Re-exports
pub use huffman::HuffmanTree;
pub use inflate::{DEFAULT_OUTPUT_LIMIT, Inflater, inflate, inflate_with_limit};
pub use stored::deflate_stored;
pub use zlib::{Adler32, is_zlib_header, zlib_decompress};

/// Framing of a compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamFormat {
    /// zlib if the stream opens with a valid zlib header, raw otherwise.
    /// A raw stored block can open with bytes that pass the zlib header
    /// check, so a failed zlib decode is retried as raw.
    #[default]
    Auto,
    /// Raw DEFLATE.
    Raw,
    /// zlib-wrapped DEFLATE.
    Zlib,
}

impl StreamFormat {
    /// Resolve `Auto` against the first bytes of `data`.
    pub fn detect(self, data: &[u8]) -> Self {
        match self {
            Self::Auto if is_zlib_header(data) => Self::Zlib,
            Self::Auto => Self::Raw,
            other => other,
        }
    }
}

/// Decompress `data` in the given framing, capping output at `limit` bytes.
///
/// Under [`StreamFormat::Auto`] a stream that looks like zlib but fails to
/// decode as zlib is decoded again as raw DEFLATE. If both attempts fail
/// the zlib error is returned.
pub fn decompress(data: &[u8], format: StreamFormat, limit: usize) -> Result<Vec<u8>> {
    match (format, format.detect(data)) {
        (StreamFormat::Auto, StreamFormat::Zlib) => match zlib_decompress(data, limit) {
            Ok(out) => Ok(out),
            Err(e @ CodecError::OutputLimitExceeded { .. }) => Err(e),
            Err(e) => inflate_with_limit(data, limit).map_err(|_| e),
        },
        (_, StreamFormat::Zlib) => zlib_decompress(data, limit),
        _ => inflate_with_limit(data, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(StreamFormat::Auto.detect(&[0x78, 0x9C]), StreamFormat::Zlib);
        assert_eq!(StreamFormat::Auto.detect(&[0x01, 0x00]), StreamFormat::Raw);
        assert_eq!(StreamFormat::Auto.detect(&[]), StreamFormat::Raw);
        assert_eq!(StreamFormat::Raw.detect(&[0x78, 0x9C]), StreamFormat::Raw);
        assert_eq!(StreamFormat::Zlib.detect(&[0x01]), StreamFormat::Zlib);
    }

    #[test]
    fn test_decompress_dispatch() {
        let raw = deflate_stored(b"payload");
        assert_eq!(
            decompress(&raw, StreamFormat::Auto, DEFAULT_OUTPUT_LIMIT).unwrap(),
            b"payload"
        );
        assert!(decompress(&raw, StreamFormat::Zlib, DEFAULT_OUTPUT_LIMIT).is_err());
    }

    #[test]
    fn test_auto_keeps_zlib_error_when_raw_also_fails() {
        // Valid zlib header, then garbage.
        let data = [0x78, 0x9C, 0xFF, 0xFF, 0xFF];
        let auto = decompress(&data, StreamFormat::Auto, DEFAULT_OUTPUT_LIMIT).unwrap_err();
        let zlib = decompress(&data, StreamFormat::Zlib, DEFAULT_OUTPUT_LIMIT).unwrap_err();
        assert_eq!(auto.to_string(), zlib.to_string());
    }
}
