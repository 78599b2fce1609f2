//! ZIP archive format support.
//!
//! Reading and writing of ZIP archives as specified in the PKWARE APPNOTE,
//! limited to stored and deflate members in single-disk, non-Zip64
//! archives.

mod conformance;
pub mod header;
mod reader;
mod writer;

pub use conformance::{ConformanceReport, Mismatch, MismatchField};
pub use header::{CentralDirectoryHeader, DataDescriptor, EndOfCentralDirectory, LocalFileHeader};
pub use reader::{EntrySource, ZipReader};
pub use writer::{ZipMethod, ZipWriter};

use ndoc_core::error::Result;
use std::io::{Read, Seek};

/// Read a ZIP archive through its central directory.
pub fn read_zip<R: Read + Seek>(reader: R) -> Result<ZipReader<R>> {
    ZipReader::new(reader)
}

/// Build an in-memory archive from `(name, data)` pairs.
pub fn build_zip<'a, I>(files: I, method: ZipMethod) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut writer = ZipWriter::new(Vec::new());
    for (name, data) in files {
        writer.add_file(name, data, method)?;
    }
    writer.finish()
}
