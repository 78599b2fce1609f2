//! # ndoc-archive
//!
//! ZIP container support for NDOC decoding.
//!
//! - **Reading** through the central directory, or by walking local
//!   headers when the directory is missing or untrusted
//! - **Extraction** of stored and deflate members with CRC-32 verification
//!   and an output size cap
//! - **Conformance check** comparing each local header with its central
//!   directory record
//! - **Writing** archives with stored or deflate (stored-block) members
//!
//! ## Example
//!
//! ```rust
//! use ndoc_archive::zip::{ZipMethod, ZipReader, build_zip};
//! use std::io::Cursor;
//!
//! let bytes = build_zip([("document.word.pb", &b"data"[..])], ZipMethod::Deflate).unwrap();
//! let mut reader = ZipReader::new(Cursor::new(bytes)).unwrap();
//! assert!(reader.conformance().unwrap().is_conformant());
//! assert_eq!(reader.extract_by_name("document.word.pb").unwrap(), b"data");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod zip;

// Re-exports
pub use zip::{
    ConformanceReport, EntrySource, Mismatch, MismatchField, ZipMethod, ZipReader, ZipWriter,
};
