//! Zlib (RFC 1950) unwrapping.
//!
//! ```text
//! +---+---+============+---+---+---+---+
//! |CMF|FLG| compressed |    ADLER32    |
//! +---+---+============+---+---+---+---+
//! ```
//!
//! - CMF bits 0-3: CM, must be 8 (DEFLATE); bits 4-7: CINFO, at most 7
//! - FLG bits 0-4: FCHECK, so that `(CMF*256 + FLG) % 31 == 0`
//! - FLG bit 5: FDICT, preset dictionary (not supported here)
//! - ADLER32: checksum of the uncompressed data, big-endian

use crate::inflate::Inflater;
use ndoc_core::BitReader;
use ndoc_core::error::{CodecError, Result};

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Bytes that can be summed before `b` could overflow a u32.
const NMAX: usize = 5552;

/// Adler-32 checksum calculator.
#[derive(Clone, Debug)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new Adler-32 calculator.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        let (mut a, mut b) = (self.a, self.b);

        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                a += byte as u32;
                b += a;
            }
            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    /// Return the checksum.
    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute Adler-32 of a slice in one call.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.finish()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `data` starts with a valid two-byte zlib header that this crate
/// can decode (DEFLATE method, window ≤ 32 KiB, no preset dictionary).
pub fn is_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => {
            let cm = cmf & 0x0F;
            let cinfo = cmf >> 4;
            let fdict = flg & 0x20 != 0;
            cm == 8 && cinfo <= 7 && !fdict && (u16::from(*cmf) * 256 + u16::from(*flg)) % 31 == 0
        }
        _ => false,
    }
}

/// Decompress a zlib stream, verifying its Adler-32 trailer.
///
/// Output larger than `limit` bytes is an error.
pub fn zlib_decompress(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let [cmf, flg, ..] = *data else {
        return Err(CodecError::unexpected_eof(2 - data.len()));
    };

    if cmf & 0x0F != 8 {
        return Err(CodecError::unsupported_method(format!(
            "zlib compression method {}",
            cmf & 0x0F
        )));
    }
    if cmf >> 4 > 7 {
        return Err(CodecError::invalid_header(format!(
            "zlib window size 2^{} exceeds 32K",
            (cmf >> 4) + 8
        )));
    }
    if (u16::from(cmf) * 256 + u16::from(flg)) % 31 != 0 {
        return Err(CodecError::invalid_header("zlib header check bits"));
    }
    if flg & 0x20 != 0 {
        return Err(CodecError::invalid_header(
            "zlib preset dictionary not supported",
        ));
    }

    let mut reader = BitReader::new(&data[2..]);
    let mut inflater = Inflater::with_limit(limit);
    inflater.inflate(&mut reader)?;

    let trailer = reader.remaining_aligned();
    let [t0, t1, t2, t3, ..] = *trailer else {
        return Err(CodecError::unexpected_eof(4 - trailer.len()));
    };
    let expected = u32::from_be_bytes([t0, t1, t2, t3]);

    let output = inflater.into_output();
    let computed = Adler32::checksum(&output);
    if expected != computed {
        return Err(CodecError::adler_mismatch(expected, computed));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::DEFAULT_OUTPUT_LIMIT;

    // zlib.compress(b"Hello")
    const HELLO_ZLIB: [u8; 13] = [
        0x78, 0x9C, 0xF3, 0x48, 0xCD, 0xC9, 0xC9, 0x07, 0x00, 0x05, 0x8C, 0x01, 0xF5,
    ];

    #[test]
    fn test_adler32() {
        assert_eq!(Adler32::checksum(b""), 1);
        assert_eq!(Adler32::checksum(b"Wikipedia"), 0x11E60398);

        let data = vec![0xFFu8; NMAX * 3 + 17];
        let mut incremental = Adler32::new();
        for chunk in data.chunks(1000) {
            incremental.update(chunk);
        }
        assert_eq!(incremental.finish(), Adler32::checksum(&data));
    }

    #[test]
    fn test_header_detection() {
        assert!(is_zlib_header(&[0x78, 0x9C]));
        assert!(is_zlib_header(&[0x78, 0x01]));
        assert!(is_zlib_header(&[0x78, 0xDA]));
        // Raw stored block header.
        assert!(!is_zlib_header(&[0x01, 0x05]));
        // Bad check bits.
        assert!(!is_zlib_header(&[0x78, 0x9D]));
        // FDICT set (0x78BB % 31 == 0).
        assert!(!is_zlib_header(&[0x78, 0xBB]));
        assert!(!is_zlib_header(&[0x78]));
    }

    #[test]
    fn test_decompress_hello() {
        assert_eq!(
            zlib_decompress(&HELLO_ZLIB, DEFAULT_OUTPUT_LIMIT).unwrap(),
            b"Hello"
        );
    }

    #[test]
    fn test_bad_checksum() {
        let mut data = HELLO_ZLIB;
        data[12] ^= 0x01;
        assert!(matches!(
            zlib_decompress(&data, DEFAULT_OUTPUT_LIMIT),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_trailer() {
        let err = zlib_decompress(&HELLO_ZLIB[..10], DEFAULT_OUTPUT_LIMIT).unwrap_err();
        assert!(err.is_truncation());
    }
}
