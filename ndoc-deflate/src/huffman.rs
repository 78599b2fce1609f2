//! Canonical Huffman decoding for DEFLATE.
//!
//! DEFLATE transmits only code lengths; codes of equal length are assigned
//! consecutive values in symbol order (RFC 1951 Section 3.2.2). Decoding
//! uses a direct lookup table for short codes and falls back to a
//! count-per-length walk for codes longer than the table width.

use ndoc_core::BitReader;
use ndoc_core::error::{CodecError, Result};

/// Maximum code length in DEFLATE (15 bits).
pub const MAX_CODE_LENGTH: usize = 15;

/// A decoding table built from code lengths.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    /// Indexed by the next `fast_bits` stream bits: (symbol, code length).
    /// A length of 0 means the code is longer than `fast_bits`.
    fast_table: Vec<(u16, u8)>,
    /// Width of the fast table index.
    fast_bits: u8,
    /// Number of codes of each length.
    counts: [u16; MAX_CODE_LENGTH + 1],
    /// Symbols ordered by (code length, symbol value).
    symbols: Vec<u16>,
}

impl HuffmanTree {
    /// Width of the fast lookup table.
    const FAST_BITS: u8 = 9;

    /// Build a tree from code lengths.
    ///
    /// `code_lengths[i]` is the bit length for symbol `i`; zero means unused.
    /// Incomplete codes are accepted (RFC 1951 permits a single distance
    /// code); over-subscribed codes are rejected.
    pub fn from_code_lengths(code_lengths: &[u8]) -> Result<Self> {
        if code_lengths.is_empty() {
            return Err(CodecError::invalid_header("Empty code lengths"));
        }

        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        for &len in code_lengths {
            if len as usize > MAX_CODE_LENGTH {
                return Err(CodecError::invalid_header(format!(
                    "Code length {} exceeds maximum {}",
                    len, MAX_CODE_LENGTH
                )));
            }
            counts[len as usize] += 1;
        }
        counts[0] = 0;

        let mut left: i32 = 1;
        for &count in &counts[1..] {
            left <<= 1;
            left -= count as i32;
            if left < 0 {
                return Err(CodecError::invalid_header("Over-subscribed Huffman tree"));
            }
        }

        // Offsets into `symbols` for each length.
        let mut offsets = [0u16; MAX_CODE_LENGTH + 2];
        for len in 1..=MAX_CODE_LENGTH {
            offsets[len + 1] = offsets[len] + counts[len];
        }

        let mut symbols = vec![0u16; offsets[MAX_CODE_LENGTH + 1] as usize];
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len > 0 {
                let slot = &mut offsets[len as usize];
                symbols[*slot as usize] = symbol as u16;
                *slot += 1;
            }
        }

        let max_length = (1..=MAX_CODE_LENGTH)
            .rev()
            .find(|&len| counts[len] > 0)
            .unwrap_or(0) as u8;
        let fast_bits = Self::FAST_BITS.min(max_length.max(1));
        let fast_table = Self::build_fast_table(code_lengths, &counts, fast_bits);

        Ok(Self {
            fast_table,
            fast_bits,
            counts,
            symbols,
        })
    }

    fn build_fast_table(
        code_lengths: &[u8],
        counts: &[u16; MAX_CODE_LENGTH + 1],
        fast_bits: u8,
    ) -> Vec<(u16, u8)> {
        let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        for len in 1..=MAX_CODE_LENGTH {
            code = (code + counts[len - 1] as u32) << 1;
            next_code[len] = code;
        }

        let size = 1usize << fast_bits;
        let mut table = vec![(0u16, 0u8); size];

        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let code = next_code[len as usize];
            next_code[len as usize] += 1;
            if len > fast_bits {
                continue;
            }

            // Stream bits arrive LSB-first, so index by the reversed code.
            let reversed = reverse_bits(code, len) as usize;
            let mut index = reversed;
            while index < size {
                table[index] = (symbol as u16, len);
                index += 1 << len;
            }
        }

        table
    }

    /// Whether the tree has no codes at all.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Decode one symbol.
    #[inline]
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        if self.is_empty() {
            return Err(CodecError::invalid_huffman(reader.bit_position()));
        }

        let (bits, available) = reader.peek_bits_padded(self.fast_bits);
        let (symbol, len) = self.fast_table[bits as usize];
        if len > 0 && len <= available {
            reader.consume(len);
            return Ok(symbol);
        }

        self.decode_slow(reader)
    }

    /// Bit-at-a-time canonical decode for long codes and the input tail.
    fn decode_slow(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let start = reader.bit_position();
        let mut code: i32 = 0;
        let mut first: i32 = 0;
        let mut index: i32 = 0;

        for len in 1..=MAX_CODE_LENGTH {
            code |= reader.read_bit()? as i32;
            let count = self.counts[len] as i32;
            if code - first < count {
                return Ok(self.symbols[(index + code - first) as usize]);
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }

        Err(CodecError::invalid_huffman(start))
    }
}

/// Reverse the low `length` bits of `code`.
fn reverse_bits(code: u32, length: u8) -> u32 {
    let mut code = code;
    let mut reversed = 0u32;
    for _ in 0..length {
        reversed = (reversed << 1) | (code & 1);
        code >>= 1;
    }
    reversed
}
