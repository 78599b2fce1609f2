//! ZIP archive writer.

use super::header::{
    CentralDirectoryHeader, DataDescriptor, EndOfCentralDirectory, FLAG_DATA_DESCRIPTOR,
    LocalFileHeader, ZIP64_MARKER_16, ZIP64_MARKER_32,
};
use ndoc_core::error::{CodecError, Result};
use ndoc_core::{CompressionMethod, Crc32};
use ndoc_deflate::deflate_stored;
use std::io::Write;

/// Fixed DOS date (1980-01-01) so output does not depend on the clock.
const DOS_DATE: u16 = 0x0021;

/// Fixed DOS time (00:00:00).
const DOS_TIME: u16 = 0;

/// Version 2.0: deflate and directories.
const VERSION: u16 = 20;

/// How a member is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZipMethod {
    /// Method 0, bytes as-is.
    Stored,
    /// Method 8, wrapped in stored DEFLATE blocks.
    #[default]
    Deflate,
}

impl ZipMethod {
    fn encode(self, data: &[u8]) -> (CompressionMethod, Vec<u8>) {
        match self {
            Self::Stored => (CompressionMethod::Stored, data.to_vec()),
            Self::Deflate => (CompressionMethod::Deflate, deflate_stored(data)),
        }
    }
}

/// ZIP archive writer.
pub struct ZipWriter<W: Write> {
    writer: W,
    entries: Vec<CentralDirectoryHeader>,
    offset: u64,
    data_descriptor: bool,
}

impl<W: Write> ZipWriter<W> {
    /// Create a new ZIP writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            entries: Vec::new(),
            offset: 0,
            data_descriptor: false,
        }
    }

    /// Defer CRC and sizes of subsequent entries to a trailing data
    /// descriptor, leaving them zero in the local header.
    pub fn set_data_descriptor(&mut self, enabled: bool) {
        self.data_descriptor = enabled;
    }

    fn offset_u32(&self) -> Result<u32> {
        u32::try_from(self.offset)
            .ok()
            .filter(|&offset| offset != ZIP64_MARKER_32)
            .ok_or_else(|| CodecError::unsupported_method("Zip64 (archive larger than 4 GiB)"))
    }

    /// Add a file to the archive.
    pub fn add_file(&mut self, name: &str, data: &[u8], method: ZipMethod) -> Result<()> {
        let (method, payload) = method.encode(data);
        self.add_entry(name, data, method, &payload)
    }

    /// Add a directory entry. A trailing `/` is appended if missing.
    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{}/", name)
        };
        self.add_entry(&name, &[], CompressionMethod::Stored, &[])
    }

    fn add_entry(
        &mut self,
        name: &str,
        data: &[u8],
        method: CompressionMethod,
        payload: &[u8],
    ) -> Result<()> {
        if name.len() > usize::from(u16::MAX) {
            return Err(CodecError::invalid_header(format!(
                "Entry name is {} bytes, limit is 65535",
                name.len()
            )));
        }
        let compressed_size = u32::try_from(payload.len())
            .map_err(|_| CodecError::unsupported_method("Zip64 (member larger than 4 GiB)"))?;
        let uncompressed_size = u32::try_from(data.len())
            .map_err(|_| CodecError::unsupported_method("Zip64 (member larger than 4 GiB)"))?;

        let crc32 = Crc32::compute(data);
        let local_header_offset = self.offset_u32()?;
        let deferred = self.data_descriptor;
        let flags = if deferred { FLAG_DATA_DESCRIPTOR } else { 0 };

        let local = LocalFileHeader {
            version_needed: VERSION,
            flags,
            method,
            mtime: DOS_TIME,
            mdate: DOS_DATE,
            crc32: if deferred { 0 } else { crc32 },
            compressed_size: if deferred { 0 } else { compressed_size },
            uncompressed_size: if deferred { 0 } else { uncompressed_size },
            filename: name.to_string(),
            extra: Vec::new(),
        };
        local.write(&mut self.writer)?;
        self.writer.write_all(payload)?;
        self.offset += local.encoded_len() + payload.len() as u64;

        if deferred {
            DataDescriptor {
                crc32,
                compressed_size,
                uncompressed_size,
            }
            .write(&mut self.writer)?;
            self.offset += 16;
        }

        self.entries.push(CentralDirectoryHeader {
            version_made_by: VERSION,
            version_needed: VERSION,
            flags,
            method,
            mtime: DOS_TIME,
            mdate: DOS_DATE,
            crc32,
            compressed_size,
            uncompressed_size,
            filename: name.to_string(),
            extra: Vec::new(),
            comment: String::new(),
            disk_start: 0,
            internal_attr: 0,
            external_attr: if name.ends_with('/') { 0x10 } else { 0 },
            local_header_offset,
        });

        Ok(())
    }

    /// Write the central directory and end record, returning the inner writer.
    pub fn finish(mut self) -> Result<W> {
        if self.entries.len() >= usize::from(ZIP64_MARKER_16) {
            return Err(CodecError::unsupported_method("Zip64 (too many entries)"));
        }

        let cd_offset = self.offset_u32()?;
        let mut cd_size = 0u64;
        for entry in &self.entries {
            entry.write(&mut self.writer)?;
            cd_size += entry.encoded_len();
        }
        let cd_size = u32::try_from(cd_size)
            .map_err(|_| CodecError::unsupported_method("Zip64 (central directory too large)"))?;

        let count = self.entries.len() as u16;
        EndOfCentralDirectory {
            entries_on_disk: count,
            total_entries: count,
            cd_size,
            cd_offset,
            ..Default::default()
        }
        .write(&mut self.writer)?;

        self.writer.flush()?;
        Ok(self.writer)
    }
}
