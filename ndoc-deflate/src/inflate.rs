//! DEFLATE decompression (inflate).
//!
//! Implements RFC 1951 decoding for all three block types:
//! - Type 0: Stored (uncompressed)
//! - Type 1: Fixed Huffman codes
//! - Type 2: Dynamic Huffman codes
//!
//! A stream that ends before its final block is an error; partial output
//! is never returned.

use crate::huffman::HuffmanTree;
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, LENGTH_EXTRA_BITS, decode_distance, decode_length,
    fixed_distance_tree, fixed_litlen_tree,
};
use ndoc_core::BitReader;
use ndoc_core::error::{CodecError, Result};

/// Maximum back-reference distance for DEFLATE (32KB).
pub const MAX_DISTANCE: usize = 32768;

/// Default cap on decompressed output (256 MiB).
pub const DEFAULT_OUTPUT_LIMIT: usize = 256 * 1024 * 1024;

/// DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater {
    /// Decompressed output; doubles as the back-reference history.
    output: Vec<u8>,
    /// Maximum number of output bytes.
    limit: usize,
    /// Whether the final block has been decoded.
    finished: bool,
}

impl Inflater {
    /// Create a new decompressor with the default output limit.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_OUTPUT_LIMIT)
    }

    /// Create a new decompressor that fails once output exceeds `limit`.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            output: Vec::new(),
            limit,
            finished: false,
        }
    }

    /// Whether the final block has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode blocks from `reader` until the final block completes.
    pub fn inflate(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        while !self.finished {
            let bfinal = reader.read_bit()?;
            let btype = reader.read_bits(2)?;

            match btype {
                0 => self.inflate_stored(reader)?,
                1 => self.inflate_huffman(reader, fixed_litlen_tree()?, fixed_distance_tree()?)?,
                2 => self.inflate_dynamic(reader)?,
                _ => return Err(CodecError::invalid_header("Reserved block type 3")),
            }

            self.finished = bfinal;
        }

        Ok(())
    }

    /// Decompress a stored (uncompressed) block.
    fn inflate_stored(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        reader.align_to_byte();

        let len = reader.read_bits(16)? as u16;
        let nlen = reader.read_bits(16)? as u16;
        if len != !nlen {
            return Err(CodecError::corrupted(
                reader.bit_position() / 8,
                format!("LEN/NLEN mismatch: {} vs {}", len, !nlen),
            ));
        }

        let bytes = reader.read_aligned_bytes(len as usize)?;
        self.reserve(bytes.len())?;
        self.output.extend_from_slice(bytes);

        Ok(())
    }

    /// Read the code length tables of a dynamic block, then decode it.
    fn inflate_dynamic(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let hlit = reader.read_bits(5)? as usize + 257;
        let hdist = reader.read_bits(5)? as usize + 1;
        let hclen = reader.read_bits(4)? as usize + 4;

        if hlit > 286 || hdist > 30 {
            return Err(CodecError::corrupted(
                reader.bit_position() / 8,
                format!("Too many codes: {} literal/length, {} distance", hlit, hdist),
            ));
        }

        let mut code_length_lengths = [0u8; 19];
        for &slot in CODE_LENGTH_ORDER.iter().take(hclen) {
            code_length_lengths[slot] = reader.read_bits(3)? as u8;
        }
        let code_length_tree = HuffmanTree::from_code_lengths(&code_length_lengths)?;

        let mut lengths = vec![0u8; hlit + hdist];
        let mut i = 0;
        while i < lengths.len() {
            let symbol = code_length_tree.decode(reader)?;
            let (value, repeat) = match symbol {
                0..=15 => (symbol as u8, 1),
                16 => {
                    if i == 0 {
                        return Err(CodecError::corrupted(
                            reader.bit_position() / 8,
                            "Repeat code with no previous length",
                        ));
                    }
                    (lengths[i - 1], reader.read_bits(2)? as usize + 3)
                }
                17 => (0, reader.read_bits(3)? as usize + 3),
                18 => (0, reader.read_bits(7)? as usize + 11),
                _ => return Err(CodecError::invalid_huffman(reader.bit_position())),
            };

            if i + repeat > lengths.len() {
                return Err(CodecError::corrupted(
                    reader.bit_position() / 8,
                    "Code length overflow",
                ));
            }
            lengths[i..i + repeat].fill(value);
            i += repeat;
        }

        if lengths[256] == 0 {
            return Err(CodecError::corrupted(
                reader.bit_position() / 8,
                "Missing end-of-block code",
            ));
        }

        let litlen_tree = HuffmanTree::from_code_lengths(&lengths[..hlit])?;
        let dist_tree = HuffmanTree::from_code_lengths(&lengths[hlit..])?;

        self.inflate_huffman(reader, &litlen_tree, &dist_tree)
    }

    /// Decode literal/length + distance symbols until end of block.
    fn inflate_huffman(
        &mut self,
        reader: &mut BitReader<'_>,
        litlen_tree: &HuffmanTree,
        dist_tree: &HuffmanTree,
    ) -> Result<()> {
        loop {
            let code = litlen_tree.decode(reader)?;

            match code {
                0..=255 => {
                    self.reserve(1)?;
                    self.output.push(code as u8);
                }
                256 => return Ok(()),
                257..=285 => {
                    let extra_bits = LENGTH_EXTRA_BITS[(code - 257) as usize];
                    let extra = reader.read_bits(extra_bits)? as u16;
                    let length = decode_length(code, extra) as usize;

                    let dist_code = dist_tree.decode(reader)?;
                    if dist_code >= 30 {
                        return Err(CodecError::corrupted(
                            reader.bit_position() / 8,
                            format!("Invalid distance code: {}", dist_code),
                        ));
                    }
                    let dist_extra = reader.read_bits(DISTANCE_EXTRA_BITS[dist_code as usize])?;
                    let distance = decode_distance(dist_code, dist_extra as u16) as usize;

                    self.copy_match(distance, length)?;
                }
                _ => {
                    return Err(CodecError::corrupted(
                        reader.bit_position() / 8,
                        format!("Invalid literal/length code: {}", code),
                    ));
                }
            }
        }
    }

    /// Append `length` bytes copied from `distance` bytes back. Overlapping
    /// copies repeat the most recent bytes, as RFC 1951 requires.
    fn copy_match(&mut self, distance: usize, length: usize) -> Result<()> {
        if distance == 0 || distance > self.output.len() || distance > MAX_DISTANCE {
            return Err(CodecError::invalid_distance(
                distance,
                self.output.len().min(MAX_DISTANCE),
            ));
        }
        self.reserve(length)?;

        let start = self.output.len() - distance;
        for k in 0..length {
            let byte = self.output[start + k];
            self.output.push(byte);
        }

        Ok(())
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        if self.output.len() + additional > self.limit {
            return Err(CodecError::output_limit(self.limit));
        }
        self.output.reserve(additional);
        Ok(())
    }

    /// Get the decompressed output so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Take ownership of the decompressed output.
    pub fn into_output(self) -> Vec<u8> {
        self.output
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

/// Decompress raw DEFLATE data.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    inflate_with_limit(data, DEFAULT_OUTPUT_LIMIT)
}

/// Decompress raw DEFLATE data, failing if output exceeds `limit` bytes.
pub fn inflate_with_limit(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut inflater = Inflater::with_limit(limit);
    let mut reader = BitReader::new(data);
    inflater.inflate(&mut reader)?;
    Ok(inflater.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inflate_stored() {
        // BFINAL=1, BTYPE=00, aligned LEN=5, NLEN=!5, "Hello"
        let compressed = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o'];
        assert_eq!(inflate(&compressed).unwrap(), b"Hello");
    }

    #[test]
    fn test_inflate_empty_stored() {
        let compressed = [0x01, 0x00, 0x00, 0xFF, 0xFF];
        assert!(inflate(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_inflate_fixed_empty_block() {
        // BFINAL=1, BTYPE=01, then end-of-block (7 zero bits).
        assert!(inflate(&[0x03, 0x00]).unwrap().is_empty());
    }

    #[test]
    fn test_inflate_fixed_with_match() {
        // "aaaaa": literal 'a' then length 4 at distance 1.
        // Produced by zlib's raw deflate at level 6.
        let compressed = [0x4B, 0x4C, 0x04, 0x02, 0x00];
        assert_eq!(inflate(&compressed).unwrap(), b"aaaaa");
    }

    #[test]
    fn test_stored_len_mismatch() {
        let compressed = [0x01, 0x05, 0x00, 0x00, 0x00, b'H'];
        assert!(matches!(
            inflate(&compressed),
            Err(CodecError::CorruptedData { .. })
        ));
    }

    #[test]
    fn test_reserved_block_type() {
        assert!(matches!(
            inflate(&[0x07]),
            Err(CodecError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_truncated_stream_is_error() {
        // Non-final stored block with no following block.
        let compressed = [0x00, 0x01, 0x00, 0xFE, 0xFF, b'x'];
        let err = inflate(&compressed).unwrap_err();
        assert!(err.is_truncation());

        let err = inflate(&[]).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_output_limit() {
        let compressed = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o'];
        assert!(matches!(
            inflate_with_limit(&compressed, 4),
            Err(CodecError::OutputLimitExceeded { limit: 4 })
        ));
        assert_eq!(inflate_with_limit(&compressed, 5).unwrap(), b"Hello");
    }

    #[test]
    fn test_distance_before_start() {
        // Fixed block whose first symbol is a match (length 3, distance 1)
        // with no history: 257 = 0000001 (7 bits), distance code 0 = 00000.
        // Bits: 1 (BFINAL), 1 0 (BTYPE=01 LSB-first), 0000001, 00000
        let compressed = [0x03, 0x02, 0x00];
        assert!(matches!(
            inflate(&compressed),
            Err(CodecError::InvalidDistance { .. })
        ));
    }
}
