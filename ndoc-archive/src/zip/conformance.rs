//! Local header vs. central directory consistency.
//!
//! Every central directory record points at a local file header that
//! repeats most of its fields. Archives produced by a single well-behaved
//! writer agree on both copies; a disagreement means the bytes were edited
//! or damaged after writing.

use super::header::{FLAG_DATA_DESCRIPTOR, LocalFileHeader};
use super::reader::{EntrySource, ZipReader};
use ndoc_core::Entry;
use ndoc_core::error::Result;
use std::fmt;
use std::io::{Read, Seek};

/// Field that differs between a local header and its central record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchField {
    /// The local header is missing or unreadable.
    Signature,
    /// File name.
    Name,
    /// Compression method.
    Method,
    /// CRC-32.
    Crc32,
    /// Compressed size.
    CompressedSize,
    /// Uncompressed size.
    Size,
}

impl MismatchField {
    /// Get the field name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::Name => "name",
            Self::Method => "method",
            Self::Crc32 => "crc32",
            Self::CompressedSize => "compressed_size",
            Self::Size => "size",
        }
    }
}

impl fmt::Display for MismatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One disagreement found by the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Entry name from the central directory.
    pub entry: String,
    /// Offending field.
    pub field: MismatchField,
    /// Value in the local header.
    pub local: String,
    /// Value in the central directory.
    pub central: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} differs (local {}, central {})",
            self.entry, self.field, self.local, self.central
        )
    }
}

/// Result of a conformance check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceReport {
    /// Where the reader's entries came from.
    pub source: EntrySource,
    /// Number of entries compared.
    pub checked: usize,
    /// Disagreements found.
    pub mismatches: Vec<Mismatch>,
}

impl ConformanceReport {
    /// True only for archives with a central directory whose every record
    /// agrees with its local header.
    pub fn is_conformant(&self) -> bool {
        self.source == EntrySource::CentralDirectory && self.mismatches.is_empty()
    }
}

impl<R: Read + Seek> ZipReader<R> {
    /// Compare every central directory record with its local header.
    ///
    /// CRC and sizes are skipped for entries that defer them to a data
    /// descriptor. A reader opened from local headers has nothing to
    /// compare against and yields a non-conformant, empty report.
    pub fn conformance(&mut self) -> Result<ConformanceReport> {
        let mut report = ConformanceReport {
            source: self.source(),
            checked: 0,
            mismatches: Vec::new(),
        };
        if self.source() != EntrySource::CentralDirectory {
            return Ok(report);
        }

        let entries = self.entries().to_vec();
        for entry in &entries {
            report.checked += 1;
            match self.local_header(entry) {
                Ok(local) => compare(entry, &local, &mut report.mismatches),
                Err(e) => report.mismatches.push(Mismatch {
                    entry: entry.name.clone(),
                    field: MismatchField::Signature,
                    local: e.to_string(),
                    central: format!("local header at offset {}", entry.header_offset),
                }),
            }
        }

        Ok(report)
    }
}

fn compare(central: &Entry, local: &LocalFileHeader, out: &mut Vec<Mismatch>) {
    let mut push = |field, local_value: String, central_value: String| {
        out.push(Mismatch {
            entry: central.name.clone(),
            field,
            local: local_value,
            central: central_value,
        });
    };

    if local.filename != central.name {
        push(
            MismatchField::Name,
            local.filename.clone(),
            central.name.clone(),
        );
    }
    if local.method != central.method {
        push(
            MismatchField::Method,
            local.method.to_string(),
            central.method.to_string(),
        );
    }

    let deferred = local.has_data_descriptor()
        || central.flags & FLAG_DATA_DESCRIPTOR != 0;
    if deferred {
        return;
    }

    if local.crc32 != central.crc32 {
        push(
            MismatchField::Crc32,
            format!("{:#010x}", local.crc32),
            format!("{:#010x}", central.crc32),
        );
    }
    if u64::from(local.compressed_size) != central.compressed_size {
        push(
            MismatchField::CompressedSize,
            local.compressed_size.to_string(),
            central.compressed_size.to_string(),
        );
    }
    if u64::from(local.uncompressed_size) != central.size {
        push(
            MismatchField::Size,
            local.uncompressed_size.to_string(),
            central.size.to_string(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::{ZipMethod, ZipWriter};
    use std::io::Cursor;

    fn archive() -> Vec<u8> {
        let mut writer = ZipWriter::new(Vec::new());
        writer
            .add_file("document.word.pb", b"0123456789abcdef-payload", ZipMethod::Deflate)
            .unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_clean_archive_conforms() {
        let mut reader = ZipReader::new(Cursor::new(archive())).unwrap();
        let report = reader.conformance().unwrap();
        assert!(report.is_conformant());
        assert_eq!(report.checked, 1);
    }

    #[test]
    fn test_local_crc_edit_detected() {
        let mut bytes = archive();
        bytes[14] ^= 0x01;

        let mut reader = ZipReader::new(Cursor::new(bytes)).unwrap();
        let report = reader.conformance().unwrap();
        assert!(!report.is_conformant());
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].field, MismatchField::Crc32);
        assert!(report.mismatches[0].to_string().contains("crc32 differs"));
    }

    #[test]
    fn test_damaged_local_signature() {
        let mut bytes = archive();
        bytes[1] = b'X';

        let mut reader = ZipReader::new(Cursor::new(bytes)).unwrap();
        let report = reader.conformance().unwrap();
        assert_eq!(report.mismatches[0].field, MismatchField::Signature);
    }

    #[test]
    fn test_data_descriptor_skips_sizes() {
        let mut writer = ZipWriter::new(Vec::new());
        writer.set_data_descriptor(true);
        writer
            .add_file("document.word.pb", b"streamed member", ZipMethod::Deflate)
            .unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = ZipReader::new(Cursor::new(bytes.clone())).unwrap();
        assert!(reader.conformance().unwrap().is_conformant());

        let local = ZipReader::from_local_headers(Cursor::new(bytes)).unwrap();
        assert_eq!(local.entries(), reader.entries());
    }

    #[test]
    fn test_local_source_not_conformant() {
        let mut reader = ZipReader::from_local_headers(Cursor::new(archive())).unwrap();
        let report = reader.conformance().unwrap();
        assert_eq!(report.source, EntrySource::LocalHeaders);
        assert!(!report.is_conformant());
    }
}
