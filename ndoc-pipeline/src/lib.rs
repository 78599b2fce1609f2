//! # ndoc-pipeline
//!
//! Decodes NDOC containers: ZIP archives disguised by a rewritten
//! signature and a single-byte XOR over bytes `[4, 64)`.
//!
//! ```text
//! container ──locate_key──► normalize_header ──► deobfuscate ──► extract ──► decode_entry ──► bytes
//!   C[C[2]]                  [0,4) = PK\3\4      [4,64) ^= key   document     skip 16 bytes,
//!                                                                 .word.pb     inflate
//! ```
//!
//! The stages are exposed individually in [`container`], [`extract`] and
//! [`decoder`], and composed by [`Pipeline`], which runs them as an
//! explicit state machine either in memory or asynchronously with
//! per-request scratch directories. [`DecodeBackend`] abstracts over the
//! in-process pipeline and, with the `remote` feature, an HTTP conversion
//! service.
//!
//! ## Example
//!
//! ```rust
//! use ndoc_archive::zip::{ZipMethod, build_zip};
//! use ndoc_deflate::deflate_stored;
//! use ndoc_pipeline::{Pipeline, seal};
//!
//! let mut entry = vec![0u8; 16];
//! entry.extend_from_slice(&deflate_stored(&[1, 2, 3, 4, 5]));
//! let archive = build_zip([("document.word.pb", entry.as_slice())], ZipMethod::Deflate).unwrap();
//! let container = seal(&archive, 0x7F).unwrap();
//!
//! let result = Pipeline::default().decode_bytes(container).unwrap();
//! assert_eq!(result.as_bytes(), [1, 2, 3, 4, 5]);
//! assert_eq!(result.to_json().unwrap(), r#"{"serializedData":[1,2,3,4,5]}"#);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod cancel;
pub mod container;
pub mod decoder;
pub mod error;
pub mod extract;
pub mod inspect;
pub mod options;
pub mod pipeline;
pub mod result;
pub mod scratch;
pub mod source;

pub use backend::{BoxFuture, DecodeBackend, LocalBackend};
#[cfg(feature = "remote")]
pub use backend::RemoteBackend;
pub use cancel::CancelToken;
pub use container::{ObfuscationKey, deobfuscate, locate_key, normalize_header, seal};
pub use decoder::{decode_entry, decode_entry_with};
pub use error::{ErrorKind, NdocError, Result, Stage};
pub use extract::{extract, extract_with};
pub use inspect::{EntryInfo, Inspection, inspect};
pub use options::{ConformancePolicy, DecodeOptions, PayloadFormat};
pub use pipeline::{DecodeRequest, Pipeline, PipelineState};
pub use result::{SerializedEnvelope, SerializedResult};
pub use source::ByteSource;
pub use scratch::Scratch;
