//! Static tables from RFC 1951.

use crate::huffman::HuffmanTree;
use ndoc_core::error::{CodecError, Result};
use std::sync::OnceLock;

/// Length code base values for codes 257-285 (RFC 1951 Section 3.2.5).
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264
    11, 13, 15, 17, // 265-268
    19, 23, 27, 31, // 269-272
    35, 43, 51, 59, // 273-276
    67, 83, 99, 115, // 277-280
    131, 163, 195, 227, // 281-284
    258, // 285
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance code base values for codes 0-29.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Order in which code length code lengths are transmitted in a dynamic
/// block header (RFC 1951 Section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

/// Get the fixed literal/length Huffman tree, built once.
pub fn fixed_litlen_tree() -> Result<&'static HuffmanTree> {
    static TREE: OnceLock<Option<HuffmanTree>> = OnceLock::new();

    TREE.get_or_init(|| HuffmanTree::from_code_lengths(&fixed_litlen_lengths()).ok())
        .as_ref()
        .ok_or_else(|| CodecError::invalid_header("fixed literal/length table"))
}

/// Get the fixed distance Huffman tree (30 codes, 5 bits each), built once.
pub fn fixed_distance_tree() -> Result<&'static HuffmanTree> {
    static TREE: OnceLock<Option<HuffmanTree>> = OnceLock::new();

    TREE.get_or_init(|| HuffmanTree::from_code_lengths(&[5u8; 30]).ok())
        .as_ref()
        .ok_or_else(|| CodecError::invalid_header("fixed distance table"))
}

/// Decode a match length from its code (257-285) and extra bits.
#[inline]
pub fn decode_length(code: u16, extra: u16) -> u16 {
    LENGTH_BASE[(code - 257) as usize] + extra
}

/// Decode a match distance from its code (0-29) and extra bits.
#[inline]
pub fn decode_distance(code: u16, extra: u16) -> u16 {
    DISTANCE_BASE[code as usize] + extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_lengths_layout() {
        let lengths = fixed_litlen_lengths();
        assert_eq!(lengths[0], 8);
        assert_eq!(lengths[143], 8);
        assert_eq!(lengths[144], 9);
        assert_eq!(lengths[255], 9);
        assert_eq!(lengths[256], 7);
        assert_eq!(lengths[279], 7);
        assert_eq!(lengths[280], 8);
        assert_eq!(lengths[287], 8);
    }

    #[test]
    fn test_fixed_trees_build() {
        assert!(fixed_litlen_tree().is_ok());
        assert!(fixed_distance_tree().is_ok());
    }

    #[test]
    fn test_length_and_distance_decoding() {
        assert_eq!(decode_length(257, 0), 3);
        assert_eq!(decode_length(265, 1), 12);
        assert_eq!(decode_length(284, 30), 257);
        assert_eq!(decode_length(285, 0), 258);
        assert_eq!(decode_distance(0, 0), 1);
        assert_eq!(decode_distance(4, 1), 6);
        assert_eq!(decode_distance(29, 8191), 32768);
    }
}
