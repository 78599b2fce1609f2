//! Archive extraction from a normalized, deobfuscated container.

use crate::error::{NdocError, Result, Stage};
use crate::options::{ConformancePolicy, DecodeOptions};
use ndoc_archive::{ConformanceReport, ZipReader};
use ndoc_core::CodecError;
use std::io::Cursor;
use tracing::{debug, warn};

/// Extract `entry_name` using default options.
pub fn extract(container: &[u8], entry_name: &str) -> Result<Vec<u8>> {
    extract_with(
        container,
        &DecodeOptions::default().with_entry_name(entry_name),
    )
}

/// Extract `options.entry_name`, applying the conformance policy, CRC
/// verification and size cap from `options`.
pub fn extract_with(container: &[u8], options: &DecodeOptions) -> Result<Vec<u8>> {
    let (mut reader, report) =
        open_archive(container, options.conformance, options.max_output_size)?;
    reader.set_verify_crc(options.verify_crc);

    let entry = reader
        .entry_by_name(&options.entry_name)
        .cloned()
        .ok_or_else(|| NdocError::entry_not_found(&options.entry_name))?;
    debug!(
        entry = %entry.name,
        method = %entry.method,
        compressed = entry.compressed_size,
        size = entry.size,
        source = %report.source,
        "found entry"
    );

    let raw = reader
        .read_raw(&entry)
        .map_err(|e| NdocError::archive(Stage::Extract, e))?;
    reader.unpack(&entry, raw).map_err(|e| match e {
        CodecError::ChecksumMismatch { .. } | CodecError::UnsupportedMethod { .. } => {
            NdocError::archive(Stage::Extract, e)
        }
        other => NdocError::decompression(Stage::Extract, other),
    })
}

/// Open the archive under `policy`, returning the reader and its
/// conformance report. `limit` caps every inflation the reader performs,
/// including sizing streamed members during a local header walk.
pub fn open_archive(
    container: &[u8],
    policy: ConformancePolicy,
    limit: usize,
) -> Result<(ZipReader<Cursor<&[u8]>>, ConformanceReport)> {
    let opened = ZipReader::new(Cursor::new(container));

    let mut reader = match (opened, policy) {
        (Ok(reader), _) => reader,
        (Err(e), ConformancePolicy::Strict) => return Err(NdocError::archive(Stage::Extract, e)),
        (Err(e), ConformancePolicy::Lenient) => {
            warn!(error = %e, "central directory unusable, walking local headers");
            ZipReader::from_local_headers_with_limit(Cursor::new(container), limit).map_err(
                |e| match e {
                    CodecError::OutputLimitExceeded { .. } => {
                        NdocError::decompression(Stage::Extract, e)
                    }
                    other => NdocError::archive(Stage::Extract, other),
                },
            )?
        }
    };
    reader.set_output_limit(limit);

    let report = reader
        .conformance()
        .map_err(|e| NdocError::archive(Stage::Extract, e))?;

    if report.mismatches.is_empty() {
        return Ok((reader, report));
    }

    match policy {
        ConformancePolicy::Strict => {
            let details: Vec<String> = report.mismatches.iter().map(|m| m.to_string()).collect();
            Err(NdocError::archive_msg(
                Stage::Extract,
                format!(
                    "local headers disagree with central directory: {}",
                    details.join("; ")
                ),
            ))
        }
        ConformancePolicy::Lenient => {
            for mismatch in &report.mismatches {
                warn!(%mismatch, "conformance mismatch");
            }
            Ok((reader, report))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use ndoc_archive::zip::{ZipMethod, ZipWriter, build_zip};

    fn archive() -> Vec<u8> {
        build_zip(
            [
                ("[Content_Types].xml", &b"<Types/>"[..]),
                ("document.word.pb", &b"0123456789ABCDEF payload"[..]),
            ],
            ZipMethod::Deflate,
        )
        .unwrap()
    }

    #[test]
    fn test_extract_named_entry() {
        let bytes = extract(&archive(), "document.word.pb").unwrap();
        assert_eq!(bytes, b"0123456789ABCDEF payload");
    }

    #[test]
    fn test_missing_entry() {
        let err = extract(&archive(), "missing.pb").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EntryNotFound);
    }

    #[test]
    fn test_garbage_is_archive_error() {
        let err = extract(&[0u8; 128], "document.word.pb").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArchiveFormat);

        let options = DecodeOptions::default().with_conformance(ConformancePolicy::Lenient);
        let err = extract_with(&[0u8; 128], &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArchiveFormat);
    }

    #[test]
    fn test_policy_on_local_edit() {
        let mut bytes = archive();
        // CRC field of the first local header.
        bytes[14] ^= 0xFF;

        let err = extract(&bytes, "document.word.pb").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArchiveFormat);
        assert!(err.to_string().contains("crc32"));

        let options = DecodeOptions::default().with_conformance(ConformancePolicy::Lenient);
        assert_eq!(
            extract_with(&bytes, &options).unwrap(),
            b"0123456789ABCDEF payload"
        );
    }

    #[test]
    fn test_lenient_without_central_directory() {
        let mut bytes = archive();
        let eocd = bytes.len() - 22;
        let cd = u32::from_le_bytes([
            bytes[eocd + 16],
            bytes[eocd + 17],
            bytes[eocd + 18],
            bytes[eocd + 19],
        ]) as usize;
        bytes.truncate(cd);

        assert_eq!(
            extract(&bytes, "document.word.pb").unwrap_err().kind(),
            ErrorKind::ArchiveFormat
        );
        let options = DecodeOptions::default().with_conformance(ConformancePolicy::Lenient);
        assert_eq!(
            extract_with(&bytes, &options).unwrap(),
            b"0123456789ABCDEF payload"
        );
    }

    #[test]
    fn test_lenient_walk_honors_output_limit() {
        let mut writer = ZipWriter::new(Vec::new());
        writer.set_data_descriptor(true);
        writer
            .add_file("document.word.pb", &[0x33; 1000], ZipMethod::Deflate)
            .unwrap();
        let mut bytes = writer.finish().unwrap();
        let eocd = bytes.len() - 22;
        let cd = u32::from_le_bytes(bytes[eocd + 16..eocd + 20].try_into().unwrap()) as usize;
        bytes.truncate(cd);

        let lenient = DecodeOptions::default().with_conformance(ConformancePolicy::Lenient);
        let err = extract_with(&bytes, &lenient.clone().with_max_output_size(100)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decompression);
        assert_eq!(err.stage(), Stage::Extract);

        assert_eq!(extract_with(&bytes, &lenient).unwrap(), [0x33; 1000]);
    }

    #[test]
    fn test_corrupt_member_is_decompression_error() {
        let mut bytes = archive();
        // First member's data: 30-byte header + 19-byte name, then a
        // stored block header whose type bits we flip to the reserved value.
        bytes[30 + 19] = 0x07;
        let options = DecodeOptions::default().with_entry_name("[Content_Types].xml");
        let err = extract_with(&bytes, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decompression);
        assert_eq!(err.stage(), Stage::Extract);
    }
}
