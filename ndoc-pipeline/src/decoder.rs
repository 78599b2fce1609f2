//! Payload decoding: skip the sub-header, inflate the rest.

use crate::container::SUB_HEADER_LEN;
use crate::error::{NdocError, Result, Stage};
use crate::options::PayloadFormat;
use ndoc_deflate::{DEFAULT_OUTPUT_LIMIT, decompress};

/// Decode an extracted entry with automatic framing and the default cap.
pub fn decode_entry(entry: &[u8]) -> Result<Vec<u8>> {
    decode_entry_with(entry, PayloadFormat::Auto, DEFAULT_OUTPUT_LIMIT)
}

/// Decode an extracted entry.
///
/// Fails without returning partial output if the stream is malformed or
/// ends early.
pub fn decode_entry_with(entry: &[u8], format: PayloadFormat, limit: usize) -> Result<Vec<u8>> {
    let payload = entry
        .get(SUB_HEADER_LEN..)
        .ok_or_else(|| NdocError::truncated(Stage::Decode, SUB_HEADER_LEN, entry.len()))?;

    decompress(payload, format.into(), limit)
        .map_err(|e| NdocError::decompression(Stage::Decode, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use ndoc_deflate::deflate_stored;

    fn entry(payload: &[u8]) -> Vec<u8> {
        let mut entry = vec![0xEE; SUB_HEADER_LEN];
        entry.extend_from_slice(payload);
        entry
    }

    #[test]
    fn test_skips_sub_header() {
        let bytes = entry(&deflate_stored(&[1, 2, 3, 4, 5]));
        assert_eq!(decode_entry(&bytes).unwrap(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_short_entry() {
        let err = decode_entry(&[0u8; 15]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedInput);
        assert_eq!(err.stage(), Stage::Decode);
    }

    #[test]
    fn test_empty_payload_is_decompression_error() {
        let err = decode_entry(&[0u8; 16]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decompression);
    }

    #[test]
    fn test_truncated_payload_yields_nothing() {
        let stream = deflate_stored(b"a complete sentence");
        let bytes = entry(&stream[..stream.len() - 3]);
        let err = decode_entry(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decompression);
    }

    #[test]
    fn test_forced_format() {
        let bytes = entry(&deflate_stored(b"raw"));
        assert!(decode_entry_with(&bytes, PayloadFormat::Zlib, DEFAULT_OUTPUT_LIMIT).is_err());
        assert_eq!(
            decode_entry_with(&bytes, PayloadFormat::Raw, DEFAULT_OUTPUT_LIMIT).unwrap(),
            b"raw"
        );
    }

    #[test]
    fn test_limit() {
        let bytes = entry(&deflate_stored(&[0u8; 100]));
        let err = decode_entry_with(&bytes, PayloadFormat::Auto, 99).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decompression);
    }
}
