//! Container inspection without payload decoding.

use crate::container::{HEADER_LEN, ObfuscationKey, deobfuscate, locate_key, normalize_header};
use crate::error::Result;
use crate::extract::open_archive;
use crate::options::ConformancePolicy;
use ndoc_archive::ConformanceReport;
use ndoc_core::Entry;
use ndoc_deflate::DEFAULT_OUTPUT_LIMIT;
use serde::Serialize;

/// One archive member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    /// Stored name.
    pub name: String,
    /// Compression method name.
    pub method: String,
    /// Bytes as stored.
    pub compressed_size: u64,
    /// Bytes after extraction.
    pub size: u64,
    /// Recorded CRC-32.
    pub crc32: u32,
    /// Offset of the local header.
    pub header_offset: u64,
}

impl From<&Entry> for EntryInfo {
    fn from(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            method: entry.method.to_string(),
            compressed_size: entry.compressed_size,
            size: entry.size,
            crc32: entry.crc32,
            header_offset: entry.header_offset,
        }
    }
}

/// Outcome of the conformance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConformanceSummary {
    /// `central directory` or `local headers`.
    pub source: String,
    /// Entries compared.
    pub checked: usize,
    /// Whether a central directory exists and agrees with every local
    /// header.
    pub conformant: bool,
    /// One line per disagreement.
    pub mismatches: Vec<String>,
}

impl From<&ConformanceReport> for ConformanceSummary {
    fn from(report: &ConformanceReport) -> Self {
        Self {
            source: report.source.to_string(),
            checked: report.checked,
            conformant: report.is_conformant(),
            mismatches: report.mismatches.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// What a container holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inspection {
    /// The disguise header as found.
    pub original_header: [u8; HEADER_LEN],
    /// Key pointer and key.
    pub key: ObfuscationKey,
    /// Container size in bytes.
    pub container_len: usize,
    /// Archive members in directory order.
    pub entries: Vec<EntryInfo>,
    /// Conformance check outcome.
    pub conformance: ConformanceSummary,
}

impl Inspection {
    /// Entry with the given name.
    pub fn entry(&self, name: &str) -> Option<&EntryInfo> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Undo the disguise and list the archive, tolerating conformance
/// problems so they can be reported.
pub fn inspect(container: &[u8]) -> Result<Inspection> {
    let key = locate_key(container)?;
    let mut buffer = container.to_vec();
    let original_header = normalize_header(&mut buffer)?;
    deobfuscate(&mut buffer, key.key)?;

    let (reader, report) =
        open_archive(&buffer, ConformancePolicy::Lenient, DEFAULT_OUTPUT_LIMIT)?;
    Ok(Inspection {
        original_header,
        key,
        container_len: container.len(),
        entries: reader.entries().iter().map(EntryInfo::from).collect(),
        conformance: ConformanceSummary::from(&report),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::seal;
    use crate::error::ErrorKind;
    use ndoc_archive::zip::{ZipMethod, build_zip};

    #[test]
    fn test_inspect_sealed() {
        let archive = build_zip(
            [
                ("a.txt", &b"alpha alpha alpha"[..]),
                ("document.word.pb", &[0u8; 40][..]),
            ],
            ZipMethod::Deflate,
        )
        .unwrap();
        let sealed = seal(&archive, 0x42).unwrap();

        let info = inspect(&sealed).unwrap();
        assert_eq!(info.original_header, [b'N', b'D', 3, 0x42]);
        assert_eq!(info.key.position, 3);
        assert_eq!(info.key.key, 0x42);
        assert_eq!(info.container_len, sealed.len());
        assert_eq!(info.entries.len(), 2);
        assert_eq!(info.entry("document.word.pb").unwrap().size, 40);
        assert!(info.conformance.conformant);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["key"]["key"], 0x42);
        assert_eq!(json["entries"][0]["method"], "Deflate");
    }

    #[test]
    fn test_inspect_reports_mismatch() {
        let mut archive = build_zip([("x", &[7u8; 64][..])], ZipMethod::Stored).unwrap();
        // Local CRC.
        archive[14] ^= 1;
        let info = inspect(&seal(&archive, 9).unwrap()).unwrap();
        assert!(!info.conformance.conformant);
        assert_eq!(info.conformance.mismatches.len(), 1);
    }

    #[test]
    fn test_inspect_short() {
        assert_eq!(inspect(&[1, 2]).unwrap_err().kind(), ErrorKind::TruncatedInput);
    }
}
