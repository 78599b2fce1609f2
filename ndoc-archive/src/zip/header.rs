//! ZIP header structures (PKWARE APPNOTE 4.3).

use ndoc_core::CompressionMethod;
use ndoc_core::error::{CodecError, Result};
use std::io::{Read, Seek, SeekFrom, Write};

/// ZIP local file header signature.
pub const LOCAL_FILE_HEADER_SIG: u32 = 0x04034B50;

/// ZIP central directory header signature.
pub const CENTRAL_DIR_HEADER_SIG: u32 = 0x02014B50;

/// ZIP end of central directory signature.
pub const END_OF_CENTRAL_DIR_SIG: u32 = 0x06054B50;

/// Data descriptor signature (optional, PK\x07\x08).
pub const DATA_DESCRIPTOR_SIG: u32 = 0x08074B50;

/// Flag bit for data descriptor presence.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Marker for 32-bit fields whose real value lives in a Zip64 extra field.
pub const ZIP64_MARKER_32: u32 = 0xFFFF_FFFF;

/// Marker for 16-bit fields whose real value lives in a Zip64 record.
pub const ZIP64_MARKER_16: u16 = 0xFFFF;

/// Largest EOCD comment.
const MAX_COMMENT_LEN: u64 = 65535;

#[inline]
fn le16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

#[inline]
fn le32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn check_signature(found: u32, expected: u32) -> Result<()> {
    if found != expected {
        return Err(CodecError::invalid_magic(
            expected.to_le_bytes(),
            found.to_le_bytes(),
        ));
    }
    Ok(())
}

fn read_string<R: Read>(reader: &mut R, len: usize) -> Result<String> {
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// ZIP local file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flag.
    pub flags: u16,
    /// Compression method.
    pub method: CompressionMethod,
    /// Last modification time (DOS format).
    pub mtime: u16,
    /// Last modification date (DOS format).
    pub mdate: u16,
    /// CRC-32 of uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u32,
    /// Uncompressed size.
    pub uncompressed_size: u32,
    /// File name.
    pub filename: String,
    /// Extra field.
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Size of the fixed part of the header.
    pub const FIXED_SIZE: u64 = 30;

    /// Read a local file header.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 30];
        reader.read_exact(&mut buf)?;
        check_signature(le32(&buf, 0), LOCAL_FILE_HEADER_SIG)?;

        let filename_len = le16(&buf, 26) as usize;
        let extra_len = le16(&buf, 28) as usize;

        Ok(Self {
            version_needed: le16(&buf, 4),
            flags: le16(&buf, 6),
            method: CompressionMethod::from_zip(le16(&buf, 8)),
            mtime: le16(&buf, 10),
            mdate: le16(&buf, 12),
            crc32: le32(&buf, 14),
            compressed_size: le32(&buf, 18),
            uncompressed_size: le32(&buf, 22),
            filename: read_string(reader, filename_len)?,
            extra: read_bytes(reader, extra_len)?,
        })
    }

    /// Write the header.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&LOCAL_FILE_HEADER_SIG.to_le_bytes())?;
        writer.write_all(&self.version_needed.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        writer.write_all(&self.method.to_zip().to_le_bytes())?;
        writer.write_all(&self.mtime.to_le_bytes())?;
        writer.write_all(&self.mdate.to_le_bytes())?;
        writer.write_all(&self.crc32.to_le_bytes())?;
        writer.write_all(&self.compressed_size.to_le_bytes())?;
        writer.write_all(&self.uncompressed_size.to_le_bytes())?;
        writer.write_all(&(self.filename.len() as u16).to_le_bytes())?;
        writer.write_all(&(self.extra.len() as u16).to_le_bytes())?;
        writer.write_all(self.filename.as_bytes())?;
        writer.write_all(&self.extra)?;
        Ok(())
    }

    /// Encoded size of the header, including name and extra field.
    pub fn encoded_len(&self) -> u64 {
        Self::FIXED_SIZE + self.filename.len() as u64 + self.extra.len() as u64
    }

    /// Whether CRC and sizes are deferred to a trailing data descriptor.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }
}

/// ZIP central directory file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    /// Version made by.
    pub version_made_by: u16,
    /// Version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flag.
    pub flags: u16,
    /// Compression method.
    pub method: CompressionMethod,
    /// Last modification time.
    pub mtime: u16,
    /// Last modification date.
    pub mdate: u16,
    /// CRC-32 of uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u32,
    /// Uncompressed size.
    pub uncompressed_size: u32,
    /// File name.
    pub filename: String,
    /// Extra field.
    pub extra: Vec<u8>,
    /// File comment.
    pub comment: String,
    /// Disk number start.
    pub disk_start: u16,
    /// Internal file attributes.
    pub internal_attr: u16,
    /// External file attributes.
    pub external_attr: u32,
    /// Relative offset of the local header.
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    /// Size of the fixed part of the header.
    pub const FIXED_SIZE: u64 = 46;

    /// Read a central directory header.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 46];
        reader.read_exact(&mut buf)?;
        check_signature(le32(&buf, 0), CENTRAL_DIR_HEADER_SIG)?;

        let filename_len = le16(&buf, 28) as usize;
        let extra_len = le16(&buf, 30) as usize;
        let comment_len = le16(&buf, 32) as usize;

        Ok(Self {
            version_made_by: le16(&buf, 4),
            version_needed: le16(&buf, 6),
            flags: le16(&buf, 8),
            method: CompressionMethod::from_zip(le16(&buf, 10)),
            mtime: le16(&buf, 12),
            mdate: le16(&buf, 14),
            crc32: le32(&buf, 16),
            compressed_size: le32(&buf, 20),
            uncompressed_size: le32(&buf, 24),
            disk_start: le16(&buf, 34),
            internal_attr: le16(&buf, 36),
            external_attr: le32(&buf, 38),
            local_header_offset: le32(&buf, 42),
            filename: read_string(reader, filename_len)?,
            extra: read_bytes(reader, extra_len)?,
            comment: read_string(reader, comment_len)?,
        })
    }

    /// Write the header.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&CENTRAL_DIR_HEADER_SIG.to_le_bytes())?;
        writer.write_all(&self.version_made_by.to_le_bytes())?;
        writer.write_all(&self.version_needed.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        writer.write_all(&self.method.to_zip().to_le_bytes())?;
        writer.write_all(&self.mtime.to_le_bytes())?;
        writer.write_all(&self.mdate.to_le_bytes())?;
        writer.write_all(&self.crc32.to_le_bytes())?;
        writer.write_all(&self.compressed_size.to_le_bytes())?;
        writer.write_all(&self.uncompressed_size.to_le_bytes())?;
        writer.write_all(&(self.filename.len() as u16).to_le_bytes())?;
        writer.write_all(&(self.extra.len() as u16).to_le_bytes())?;
        writer.write_all(&(self.comment.len() as u16).to_le_bytes())?;
        writer.write_all(&self.disk_start.to_le_bytes())?;
        writer.write_all(&self.internal_attr.to_le_bytes())?;
        writer.write_all(&self.external_attr.to_le_bytes())?;
        writer.write_all(&self.local_header_offset.to_le_bytes())?;
        writer.write_all(self.filename.as_bytes())?;
        writer.write_all(&self.extra)?;
        writer.write_all(self.comment.as_bytes())?;
        Ok(())
    }

    /// Encoded size of the header.
    pub fn encoded_len(&self) -> u64 {
        Self::FIXED_SIZE
            + self.filename.len() as u64
            + self.extra.len() as u64
            + self.comment.len() as u64
    }

    /// Whether any field carries a Zip64 marker.
    pub fn uses_zip64(&self) -> bool {
        self.compressed_size == ZIP64_MARKER_32
            || self.uncompressed_size == ZIP64_MARKER_32
            || self.local_header_offset == ZIP64_MARKER_32
    }
}

/// End of central directory record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Number of this disk.
    pub disk_number: u16,
    /// Disk where the central directory starts.
    pub cd_disk: u16,
    /// Central directory records on this disk.
    pub entries_on_disk: u16,
    /// Total central directory records.
    pub total_entries: u16,
    /// Size of the central directory in bytes.
    pub cd_size: u32,
    /// Offset of the central directory from the start of the archive.
    pub cd_offset: u32,
    /// Archive comment.
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    /// Size of the fixed part of the record.
    pub const FIXED_SIZE: u64 = 22;

    /// Locate the record by scanning backwards from the end of the archive.
    ///
    /// Returns the record and its offset. A candidate signature is only
    /// accepted if its comment length fits in the bytes that follow it.
    pub fn find<R: Read + Seek>(reader: &mut R, archive_len: u64) -> Result<(u64, Self)> {
        if archive_len < Self::FIXED_SIZE {
            return Err(CodecError::invalid_header(
                "Archive too short for end of central directory",
            ));
        }

        let search_start = archive_len.saturating_sub(MAX_COMMENT_LEN + Self::FIXED_SIZE);
        reader.seek(SeekFrom::Start(search_start))?;
        let buf = read_bytes(reader, (archive_len - search_start) as usize)?;

        let signature = END_OF_CENTRAL_DIR_SIG.to_le_bytes();
        let last_candidate = buf.len() - Self::FIXED_SIZE as usize;

        for at in (0..=last_candidate).rev() {
            if buf[at..at + 4] != signature {
                continue;
            }
            let record = &buf[at..];
            let comment_len = le16(record, 20) as usize;
            if Self::FIXED_SIZE as usize + comment_len > record.len() {
                continue;
            }

            let eocd = Self {
                disk_number: le16(record, 4),
                cd_disk: le16(record, 6),
                entries_on_disk: le16(record, 8),
                total_entries: le16(record, 10),
                cd_size: le32(record, 12),
                cd_offset: le32(record, 16),
                comment: record[22..22 + comment_len].to_vec(),
            };
            return Ok((search_start + at as u64, eocd));
        }

        Err(CodecError::invalid_header(
            "End of central directory not found",
        ))
    }

    /// Write the record.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&END_OF_CENTRAL_DIR_SIG.to_le_bytes())?;
        writer.write_all(&self.disk_number.to_le_bytes())?;
        writer.write_all(&self.cd_disk.to_le_bytes())?;
        writer.write_all(&self.entries_on_disk.to_le_bytes())?;
        writer.write_all(&self.total_entries.to_le_bytes())?;
        writer.write_all(&self.cd_size.to_le_bytes())?;
        writer.write_all(&self.cd_offset.to_le_bytes())?;
        writer.write_all(&(self.comment.len() as u16).to_le_bytes())?;
        writer.write_all(&self.comment)?;
        Ok(())
    }

    /// Whether the record defers to a Zip64 end of central directory.
    pub fn uses_zip64(&self) -> bool {
        self.total_entries == ZIP64_MARKER_16
            || self.cd_size == ZIP64_MARKER_32
            || self.cd_offset == ZIP64_MARKER_32
    }
}

/// Data descriptor that follows member data when
/// [`FLAG_DATA_DESCRIPTOR`] is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    /// CRC-32 of uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u32,
    /// Uncompressed size.
    pub uncompressed_size: u32,
}

impl DataDescriptor {
    /// Read a descriptor with or without its optional signature.
    ///
    /// Returns the descriptor and the number of bytes it occupied.
    pub fn read<R: Read>(reader: &mut R) -> Result<(Self, u64)> {
        let mut buf = [0u8; 16];
        reader.read_exact(&mut buf[..12])?;

        if le32(&buf, 0) == DATA_DESCRIPTOR_SIG {
            reader.read_exact(&mut buf[12..])?;
            Ok((
                Self {
                    crc32: le32(&buf, 4),
                    compressed_size: le32(&buf, 8),
                    uncompressed_size: le32(&buf, 12),
                },
                16,
            ))
        } else {
            Ok((
                Self {
                    crc32: le32(&buf, 0),
                    compressed_size: le32(&buf, 4),
                    uncompressed_size: le32(&buf, 8),
                },
                12,
            ))
        }
    }

    /// Write the descriptor with its signature.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&DATA_DESCRIPTOR_SIG.to_le_bytes())?;
        writer.write_all(&self.crc32.to_le_bytes())?;
        writer.write_all(&self.compressed_size.to_le_bytes())?;
        writer.write_all(&self.uncompressed_size.to_le_bytes())?;
        Ok(())
    }
}
