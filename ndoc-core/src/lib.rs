//! # NDOC Core
//!
//! Core components shared by the NDOC decoding crates.
//!
//! - [`bitstream`]: LSB-first bit reader over an in-memory slice
//! - [`crc`]: CRC-32 (ISO 3309) as used by ZIP
//! - [`entry`]: Archive entry metadata
//! - [`error`]: Codec and container error types
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L4: Pipeline + CLI                                      │
//! │     key location, deobfuscation, backends               │
//! ├─────────────────────────────────────────────────────────┤
//! │ L3: Container                                           │
//! │     ZIP local/central headers, extraction               │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     DEFLATE (RFC 1951), zlib wrapper (RFC 1950)         │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: BitStream (this crate)                              │
//! │     BitReader, CRC-32, errors                           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use ndoc_core::bitstream::BitReader;
//! use ndoc_core::crc::Crc32;
//!
//! let data = [0xAB, 0xCD];
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.read_bits(12).unwrap(), 0xDAB);
//!
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod crc;
pub mod entry;
pub mod error;

// Re-exports for convenience
pub use bitstream::BitReader;
pub use crc::Crc32;
pub use entry::{CompressionMethod, Entry};
pub use error::{CodecError, Result};
