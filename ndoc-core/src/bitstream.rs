//! Bit-level reading for DEFLATE streams.
//!
//! DEFLATE packs bits LSB-first within each byte. [`BitReader`] walks an
//! in-memory slice, keeping up to 64 bits buffered so Huffman lookups can
//! peek ahead without touching the slice on every call.
//!
//! # Example
//!
//! ```
//! use ndoc_core::bitstream::BitReader;
//!
//! let data = [0b1110_0101];
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(5).unwrap(), 0b11100);
//! ```

use crate::error::{CodecError, Result};

/// An LSB-first bit reader over a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Source bytes.
    data: &'a [u8],
    /// Index of the next byte not yet loaded into `buffer`.
    pos: usize,
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of valid bits in buffer. Always whole bytes plus the
    /// unconsumed tail of the last partially read byte.
    bits_in_buffer: u8,
    /// Total bits consumed (for error reporting).
    total_bits_read: u64,
}

impl<'a> BitReader<'a> {
    /// Create a new `BitReader` over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buffer: 0,
            bits_in_buffer: 0,
            total_bits_read: 0,
        }
    }

    /// Get the current bit position (for error reporting).
    pub fn bit_position(&self) -> u64 {
        self.total_bits_read
    }

    /// Number of whole bytes consumed so far, counting a partially
    /// consumed byte as consumed.
    pub fn byte_position(&self) -> usize {
        self.total_bits_read.div_ceil(8) as usize
    }

    /// Whether the read position sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.total_bits_read % 8 == 0
    }

    /// Load whole bytes into the buffer until it holds at least 57 bits
    /// or the slice is exhausted.
    #[inline]
    fn refill(&mut self) {
        while self.bits_in_buffer <= 56 && self.pos < self.data.len() {
            self.buffer |= (self.data[self.pos] as u64) << self.bits_in_buffer;
            self.pos += 1;
            self.bits_in_buffer += 8;
        }
    }

    /// Ensure at least `count` bits are buffered.
    #[inline]
    fn ensure(&mut self, count: u8) -> Result<()> {
        if self.bits_in_buffer < count {
            self.refill();
            if self.bits_in_buffer < count {
                let missing_bits = (count - self.bits_in_buffer) as usize;
                return Err(CodecError::unexpected_eof(missing_bits.div_ceil(8)));
            }
        }
        Ok(())
    }

    /// Read up to 32 bits from the stream.
    ///
    /// The first bit read lands in the LSB of the result.
    #[inline]
    pub fn read_bits(&mut self, count: u8) -> Result<u32> {
        debug_assert!(count <= 32, "Cannot read more than 32 bits at once");

        if count == 0 {
            return Ok(0);
        }

        self.ensure(count)?;

        let mask = (1u64 << count).wrapping_sub(1);
        let result = (self.buffer & mask) as u32;
        self.consume(count);

        Ok(result)
    }

    /// Read a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Peek at up to 32 bits without consuming them.
    ///
    /// Near the end of the input fewer bits may exist; the missing high bits
    /// are zero and the second tuple element reports how many are real.
    #[inline]
    pub fn peek_bits_padded(&mut self, count: u8) -> (u32, u8) {
        debug_assert!(count <= 32, "Cannot peek more than 32 bits at once");

        if self.bits_in_buffer < count {
            self.refill();
        }

        let available = self.bits_in_buffer.min(count);
        let mask = (1u64 << count).wrapping_sub(1);
        ((self.buffer & mask) as u32, available)
    }

    /// Drop `count` buffered bits. Callers must have peeked them first.
    #[inline]
    pub fn consume(&mut self, count: u8) {
        debug_assert!(count <= self.bits_in_buffer);
        self.buffer >>= count;
        self.bits_in_buffer -= count;
        self.total_bits_read += count as u64;
    }

    /// Skip to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        let pad = self.bits_in_buffer % 8;
        if pad > 0 {
            self.consume(pad);
        }
    }

    /// Read `len` bytes from a byte-aligned position.
    ///
    /// Returns a borrowed slice of the source; bytes already sitting in the
    /// bit buffer are accounted for.
    pub fn read_aligned_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if !self.is_aligned() {
            return Err(CodecError::corrupted(
                self.byte_position() as u64,
                "byte read from unaligned bit position",
            ));
        }

        let start = self.pos - (self.bits_in_buffer / 8) as usize;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                CodecError::unexpected_eof(start.saturating_add(len) - self.data.len())
            })?;

        self.buffer = 0;
        self.bits_in_buffer = 0;
        self.pos = end;
        self.total_bits_read += (len as u64) * 8;

        Ok(&self.data[start..end])
    }

    /// Bytes after the current (byte-aligned) position.
    pub fn remaining_aligned(&self) -> &'a [u8] {
        let start = self.byte_position().min(self.data.len());
        &self.data[start..]
    }
}
