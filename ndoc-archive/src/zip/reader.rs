//! ZIP archive reader.

use super::header::{
    CENTRAL_DIR_HEADER_SIG, CentralDirectoryHeader, DataDescriptor, END_OF_CENTRAL_DIR_SIG,
    EndOfCentralDirectory, LOCAL_FILE_HEADER_SIG, LocalFileHeader,
};
use ndoc_core::error::{CodecError, Result};
use ndoc_core::{BitReader, CompressionMethod, Crc32, Entry};
use ndoc_deflate::{DEFAULT_OUTPUT_LIMIT, Inflater, inflate_with_limit};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// Where the entry list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    /// The central directory at the end of the archive.
    CentralDirectory,
    /// A forward walk over local file headers from offset 0.
    LocalHeaders,
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CentralDirectory => write!(f, "central directory"),
            Self::LocalHeaders => write!(f, "local headers"),
        }
    }
}

/// ZIP archive reader.
pub struct ZipReader<R: Read + Seek> {
    reader: R,
    archive_len: u64,
    entries: Vec<Entry>,
    source: EntrySource,
    verify_crc: bool,
    output_limit: usize,
}

impl<R: Read + Seek> ZipReader<R> {
    /// Open an archive through its central directory.
    ///
    /// Fails if the end of central directory record is missing or the
    /// directory it points at is malformed.
    pub fn new(mut reader: R) -> Result<Self> {
        let archive_len = reader.seek(SeekFrom::End(0))?;
        let entries = Self::read_central_directory(&mut reader, archive_len)?;
        debug!(entries = entries.len(), "read central directory");
        Ok(Self::with_entries(
            reader,
            archive_len,
            entries,
            EntrySource::CentralDirectory,
        ))
    }

    /// Open an archive by walking local file headers from offset 0,
    /// ignoring any central directory.
    pub fn from_local_headers(reader: R) -> Result<Self> {
        Self::from_local_headers_with_limit(reader, DEFAULT_OUTPUT_LIMIT)
    }

    /// Like [`from_local_headers`](Self::from_local_headers), with `limit`
    /// capping both the inflation used to find the end of streamed members
    /// and later extraction.
    pub fn from_local_headers_with_limit(mut reader: R, limit: usize) -> Result<Self> {
        let archive_len = reader.seek(SeekFrom::End(0))?;
        let entries = Self::read_local_headers(&mut reader, archive_len, limit)?;
        debug!(entries = entries.len(), "walked local headers");
        let mut opened =
            Self::with_entries(reader, archive_len, entries, EntrySource::LocalHeaders);
        opened.output_limit = limit;
        Ok(opened)
    }

    fn with_entries(reader: R, archive_len: u64, entries: Vec<Entry>, source: EntrySource) -> Self {
        Self {
            reader,
            archive_len,
            entries,
            source,
            verify_crc: true,
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }

    fn read_central_directory(reader: &mut R, archive_len: u64) -> Result<Vec<Entry>> {
        let (eocd_pos, eocd) = EndOfCentralDirectory::find(reader, archive_len)?;
        if eocd.uses_zip64() {
            return Err(CodecError::unsupported_method("Zip64"));
        }
        if eocd.disk_number != 0 || eocd.cd_disk != 0 {
            return Err(CodecError::unsupported_method("multi-disk archive"));
        }

        let cd_offset = u64::from(eocd.cd_offset);
        let cd_end = cd_offset + u64::from(eocd.cd_size);
        if cd_end > eocd_pos {
            return Err(CodecError::corrupted(
                cd_offset,
                format!(
                    "Central directory [{}, {}) overlaps end record at {}",
                    cd_offset, cd_end, eocd_pos
                ),
            ));
        }

        reader.seek(SeekFrom::Start(cd_offset))?;
        let mut headers = Vec::new();
        for _ in 0..eocd.total_entries {
            let header = CentralDirectoryHeader::read(reader)?;
            if header.uses_zip64() {
                return Err(CodecError::unsupported_method("Zip64"));
            }
            if reader.stream_position()? > cd_end {
                return Err(CodecError::corrupted(
                    cd_offset,
                    "Central directory record runs past directory size",
                ));
            }
            headers.push(header);
        }

        headers
            .into_iter()
            .map(|header| Self::central_entry(reader, archive_len, header))
            .collect()
    }

    /// Build an entry from a central record. The data offset depends on the
    /// local header's own name and extra lengths, which may differ from the
    /// central copy.
    fn central_entry(
        reader: &mut R,
        archive_len: u64,
        header: CentralDirectoryHeader,
    ) -> Result<Entry> {
        let header_offset = u64::from(header.local_header_offset);
        if header_offset + LocalFileHeader::FIXED_SIZE > archive_len {
            return Err(CodecError::corrupted(
                header_offset,
                format!("Local header for {} lies past end of archive", header.filename),
            ));
        }

        reader.seek(SeekFrom::Start(header_offset + 26))?;
        let mut lens = [0u8; 4];
        reader.read_exact(&mut lens)?;
        let local_name_len = u64::from(u16::from_le_bytes([lens[0], lens[1]]));
        let local_extra_len = u64::from(u16::from_le_bytes([lens[2], lens[3]]));

        Ok(Entry {
            name: header.filename,
            method: header.method,
            flags: header.flags,
            crc32: header.crc32,
            compressed_size: u64::from(header.compressed_size),
            size: u64::from(header.uncompressed_size),
            header_offset,
            data_offset: header_offset
                + LocalFileHeader::FIXED_SIZE
                + local_name_len
                + local_extra_len,
        })
    }

    fn read_local_headers(
        reader: &mut R,
        archive_len: u64,
        limit: usize,
    ) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        let mut pos = 0u64;

        while pos + 4 <= archive_len {
            reader.seek(SeekFrom::Start(pos))?;
            let mut sig = [0u8; 4];
            reader.read_exact(&mut sig)?;

            match u32::from_le_bytes(sig) {
                LOCAL_FILE_HEADER_SIG => {}
                CENTRAL_DIR_HEADER_SIG | END_OF_CENTRAL_DIR_SIG => break,
                found if entries.is_empty() => {
                    return Err(CodecError::invalid_magic(
                        LOCAL_FILE_HEADER_SIG.to_le_bytes(),
                        found.to_le_bytes(),
                    ));
                }
                found => {
                    trace!(offset = pos, signature = found, "stopping local header walk");
                    break;
                }
            }

            reader.seek(SeekFrom::Start(pos))?;
            let header = LocalFileHeader::read(reader)?;
            let data_offset = pos + header.encoded_len();

            let mut entry = Entry {
                name: header.filename.clone(),
                method: header.method,
                flags: header.flags,
                crc32: header.crc32,
                compressed_size: u64::from(header.compressed_size),
                size: u64::from(header.uncompressed_size),
                header_offset: pos,
                data_offset,
            };

            if header.has_data_descriptor() && header.compressed_size == 0 {
                entry.compressed_size =
                    Self::measure_deferred_member(reader, archive_len, &entry, limit)?;
            }

            let data_end = data_offset + entry.compressed_size;
            if data_end > archive_len {
                return Err(CodecError::corrupted(
                    data_offset,
                    format!("Member {} runs past end of archive", entry.name),
                ));
            }
            pos = data_end;

            if header.has_data_descriptor() {
                reader.seek(SeekFrom::Start(data_end))?;
                let (descriptor, len) = DataDescriptor::read(reader)?;
                entry.crc32 = descriptor.crc32;
                entry.size = u64::from(descriptor.uncompressed_size);
                pos += len;
            }

            trace!(name = %entry.name, offset = entry.header_offset, "local header");
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Find where a deflate member with deferred sizes ends by decoding it.
    fn measure_deferred_member(
        reader: &mut R,
        archive_len: u64,
        entry: &Entry,
        limit: usize,
    ) -> Result<u64> {
        if entry.method != CompressionMethod::Deflate {
            return Err(CodecError::invalid_header(format!(
                "Cannot determine size of {} member {} without central directory",
                entry.method, entry.name
            )));
        }

        reader.seek(SeekFrom::Start(entry.data_offset))?;
        let mut rest = vec![0u8; archive_len.saturating_sub(entry.data_offset) as usize];
        reader.read_exact(&mut rest)?;

        let mut bits = BitReader::new(&rest);
        Inflater::with_limit(limit).inflate(&mut bits)?;
        Ok(bits.byte_position() as u64)
    }

    /// Where the entry list came from.
    pub fn source(&self) -> EntrySource {
        self.source
    }

    /// Total archive length in bytes.
    pub fn archive_len(&self) -> u64 {
        self.archive_len
    }

    /// Enable or disable CRC-32 verification on extraction (default: on).
    pub fn set_verify_crc(&mut self, verify: bool) {
        self.verify_crc = verify;
    }

    /// Cap the size of extracted members.
    pub fn set_output_limit(&mut self, limit: usize) {
        self.output_limit = limit;
    }

    /// Get the list of entries.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Get entry by name.
    pub fn entry_by_name(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Get entry by name, or [`CodecError::EntryNotFound`].
    pub fn find(&self, name: &str) -> Result<&Entry> {
        self.entry_by_name(name)
            .ok_or_else(|| CodecError::entry_not_found(name))
    }

    /// Read the local file header of an entry.
    pub fn local_header(&mut self, entry: &Entry) -> Result<LocalFileHeader> {
        self.reader.seek(SeekFrom::Start(entry.header_offset))?;
        LocalFileHeader::read(&mut self.reader)
    }

    /// Read an entry's stored bytes without decompressing them.
    pub fn read_raw(&mut self, entry: &Entry) -> Result<Vec<u8>> {
        let end = entry
            .data_offset
            .checked_add(entry.compressed_size)
            .filter(|&end| end <= self.archive_len)
            .ok_or_else(|| {
                CodecError::corrupted(
                    entry.data_offset,
                    format!(
                        "Member {} ({} bytes) runs past end of archive ({} bytes)",
                        entry.name, entry.compressed_size, self.archive_len
                    ),
                )
            })?;

        self.reader.seek(SeekFrom::Start(entry.data_offset))?;
        let mut raw = vec![0u8; (end - entry.data_offset) as usize];
        self.reader.read_exact(&mut raw)?;
        Ok(raw)
    }

    /// Decompress raw member bytes and verify their CRC-32.
    pub fn unpack(&self, entry: &Entry, raw: Vec<u8>) -> Result<Vec<u8>> {
        let data = match entry.method {
            CompressionMethod::Stored if raw.len() > self.output_limit => {
                return Err(CodecError::output_limit(self.output_limit));
            }
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => inflate_with_limit(&raw, self.output_limit)?,
            other => return Err(CodecError::unsupported_method(other.to_string())),
        };

        if self.verify_crc {
            let computed = Crc32::compute(&data);
            if computed != entry.crc32 {
                return Err(CodecError::crc_mismatch(entry.crc32, computed));
            }
        }

        Ok(data)
    }

    /// Extract an entry.
    pub fn extract(&mut self, entry: &Entry) -> Result<Vec<u8>> {
        let raw = self.read_raw(entry)?;
        self.unpack(entry, raw)
    }

    /// Extract the entry with the given name.
    pub fn extract_by_name(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self.find(name)?.clone();
        self.extract(&entry)
    }

    /// Give back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::{ZipMethod, ZipWriter};
    use std::io::Cursor;

    fn build(files: &[(&str, &[u8], ZipMethod)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Vec::new());
        for (name, data, method) in files {
            writer.add_file(name, data, *method).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_central_directory_entries() {
        let archive = build(&[
            ("a.txt", b"alpha", ZipMethod::Stored),
            ("document.word.pb", b"payload bytes", ZipMethod::Deflate),
        ]);
        let mut reader = ZipReader::new(Cursor::new(archive)).unwrap();

        assert_eq!(reader.source(), EntrySource::CentralDirectory);
        assert_eq!(reader.entries().len(), 2);
        let entry = reader.find("document.word.pb").unwrap().clone();
        assert_eq!(entry.method, CompressionMethod::Deflate);
        assert_eq!(entry.size, 13);
        assert_eq!(reader.extract(&entry).unwrap(), b"payload bytes");
        assert_eq!(reader.extract_by_name("a.txt").unwrap(), b"alpha");
    }

    #[test]
    fn test_missing_entry() {
        let archive = build(&[("a.txt", b"alpha", ZipMethod::Stored)]);
        let mut reader = ZipReader::new(Cursor::new(archive)).unwrap();
        assert!(matches!(
            reader.extract_by_name("document.word.pb"),
            Err(CodecError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_local_walk_matches_central() {
        let archive = build(&[
            ("one", b"first", ZipMethod::Deflate),
            ("two", b"second", ZipMethod::Stored),
        ]);
        let central = ZipReader::new(Cursor::new(archive.clone())).unwrap();
        let local = ZipReader::from_local_headers(Cursor::new(archive)).unwrap();

        assert_eq!(local.source(), EntrySource::LocalHeaders);
        assert_eq!(local.entries(), central.entries());
    }

    #[test]
    fn test_crc_mismatch_detected() {
        let mut archive = build(&[("a.txt", b"alpha", ZipMethod::Stored)]);
        // Stored data begins right after the 30-byte header and 5-byte name.
        archive[35] ^= 0xFF;

        let mut reader = ZipReader::new(Cursor::new(archive)).unwrap();
        let entry = reader.entries()[0].clone();
        assert!(matches!(
            reader.extract(&entry),
            Err(CodecError::ChecksumMismatch { .. })
        ));

        reader.set_verify_crc(false);
        assert_eq!(reader.extract(&entry).unwrap()[1..], *b"lpha");
    }

    #[test]
    fn test_no_central_directory() {
        let mut archive = build(&[("a.txt", b"alpha", ZipMethod::Stored)]);
        let cd_start = 30 + 5 + 5;
        archive.truncate(cd_start);

        assert!(ZipReader::new(Cursor::new(archive.clone())).is_err());
        let mut reader = ZipReader::from_local_headers(Cursor::new(archive)).unwrap();
        assert_eq!(reader.extract_by_name("a.txt").unwrap(), b"alpha");
    }

    #[test]
    fn test_size_past_end_rejected() {
        let archive = build(&[("a.txt", b"alpha", ZipMethod::Stored)]);
        let mut reader = ZipReader::new(Cursor::new(archive)).unwrap();
        let mut entry = reader.entries()[0].clone();
        entry.compressed_size = u64::MAX - 4;
        assert!(matches!(
            reader.read_raw(&entry),
            Err(CodecError::CorruptedData { .. })
        ));
    }

    #[test]
    fn test_output_limit() {
        let archive = build(&[("big", &[7u8; 1000], ZipMethod::Deflate)]);
        let mut reader = ZipReader::new(Cursor::new(archive)).unwrap();
        reader.set_output_limit(100);
        assert!(matches!(
            reader.extract_by_name("big"),
            Err(CodecError::OutputLimitExceeded { limit: 100 })
        ));
    }
}
