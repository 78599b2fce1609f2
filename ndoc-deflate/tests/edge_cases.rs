//! Edge case tests for DEFLATE decoding against streams produced by zlib.

use flate2::Compression;
use flate2::write::{DeflateEncoder, ZlibEncoder};
use ndoc_deflate::{StreamFormat, decompress, inflate, inflate_with_limit, zlib_decompress};
use std::io::Write;

fn raw(input: &[u8], level: u32) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(input).unwrap();
    encoder.finish().unwrap()
}

fn zlib(input: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(input).unwrap();
    encoder.finish().unwrap()
}

/// Pseudo-random bytes from a fixed-seed LCG.
fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x2545_F491u32;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            (state >> 16) as u8
        })
        .collect()
}

#[test]
fn test_empty_input() {
    assert!(inflate(&raw(b"", 6)).unwrap().is_empty());
}

#[test]
fn test_single_byte() {
    assert_eq!(inflate(&raw(b"A", 6)).unwrap(), b"A");
}

#[test]
fn test_all_same_byte() {
    let input = vec![255u8; 5000];
    assert_eq!(inflate(&raw(&input, 9)).unwrap(), input);
}

#[test]
fn test_max_match_length() {
    let input = vec![42u8; 258 * 10];
    assert_eq!(inflate(&raw(&input, 9)).unwrap(), input);
}

#[test]
fn test_dynamic_blocks_text() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(400);
    let compressed = raw(text.as_bytes(), 6);
    // Repetitive text is far smaller once compressed, so dynamic codes were used.
    assert!(compressed.len() < text.len() / 10);
    assert_eq!(inflate(&compressed).unwrap(), text.as_bytes());
}

#[test]
fn test_incompressible_data() {
    let input = noise(100_000);
    assert_eq!(inflate(&raw(&input, 6)).unwrap(), input);
    assert_eq!(inflate(&raw(&input, 0)).unwrap(), input);
}

#[test]
fn test_long_distance_match() {
    let block = noise(20_000);
    let mut input = block.clone();
    input.extend_from_slice(&[0u8; 10_000]);
    input.extend_from_slice(&block);
    assert_eq!(inflate(&raw(&input, 9)).unwrap(), input);
}

#[test]
fn test_all_levels() {
    let input: Vec<u8> = (0..50_000u32).map(|i| (i * 7 % 13) as u8).collect();
    for level in 0..=9 {
        assert_eq!(inflate(&raw(&input, level)).unwrap(), input, "level {level}");
    }
}

#[test]
fn test_zlib_stream() {
    let input = b"<document><p>hello</p></document>".repeat(50);
    let compressed = zlib(&input);
    assert_eq!(zlib_decompress(&compressed, usize::MAX).unwrap(), input);
    assert_eq!(
        decompress(&compressed, StreamFormat::Auto, usize::MAX).unwrap(),
        input
    );
}

#[test]
fn test_auto_treats_raw_as_raw() {
    let input = noise(4096);
    let compressed = raw(&input, 6);
    assert_eq!(
        decompress(&compressed, StreamFormat::Auto, usize::MAX).unwrap(),
        input
    );
}

#[test]
fn test_truncated_stream_fails() {
    let input = noise(10_000);
    let compressed = raw(&input, 6);
    for cut in [1, compressed.len() / 2, compressed.len() - 1] {
        assert!(
            inflate(&compressed[..cut]).is_err(),
            "cut at {cut} should fail"
        );
    }
}

#[test]
fn test_output_limit_on_bomb() {
    let input = vec![0u8; 1 << 20];
    let compressed = raw(&input, 9);
    assert!(compressed.len() < 4096);
    assert!(inflate_with_limit(&compressed, 1 << 16).is_err());
    assert_eq!(inflate_with_limit(&compressed, 1 << 20).unwrap().len(), 1 << 20);
}

#[test]
fn test_auto_raw_stream_with_zlib_like_start() {
    // Non-final stored block whose ignored padding bits make the first two
    // bytes a valid zlib header, then an empty final stored block.
    let stream = [0x78, 0x01, 0x00, 0xFE, 0xFF, b'A', 0x01, 0x00, 0x00, 0xFF, 0xFF];
    assert_eq!(inflate(&stream).unwrap(), b"A");
    assert!(zlib_decompress(&stream, usize::MAX).is_err());
    assert_eq!(
        decompress(&stream, StreamFormat::Auto, usize::MAX).unwrap(),
        b"A"
    );
    assert!(decompress(&stream, StreamFormat::Zlib, usize::MAX).is_err());
}
