//! NDOC container layout and the in-place transforms that turn it back into
//! a ZIP archive.
//!
//! ```text
//!  0   2   4                                64
//! +---+---+---+---...---+--------------------+------------
//! |disguise |  XOR-ed with key (60 bytes)    | ZIP bytes ...
//! +---+---+---+---...---+--------------------+------------
//!       ^
//!       C[2] = key position, key = C[C[2]]
//! ```
//!
//! The transforms borrow the buffer mutably and return before the next one
//! starts; the caller owns the buffer throughout.

use crate::error::{NdocError, Result, Stage};
use serde::Serialize;
use std::ops::Range;

/// Offset of the byte holding the key position.
pub const KEY_POINTER_OFFSET: usize = 2;

/// ZIP local file header signature restored over the disguise header.
pub const ARCHIVE_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Length of the disguise header.
pub const HEADER_LEN: usize = ARCHIVE_SIGNATURE.len();

/// Bytes XOR-ed with the key.
pub const OBFUSCATED_REGION: Range<usize> = 4..64;

/// Smallest container the full pipeline accepts.
pub const MIN_CONTAINER_LEN: usize = OBFUSCATED_REGION.end;

/// Entry holding the document payload.
pub const DEFAULT_ENTRY_NAME: &str = "document.word.pb";

/// Opaque bytes preceding the compressed payload inside the entry.
pub const SUB_HEADER_LEN: usize = 16;

/// Disguise prefix written by [`seal`].
pub const SEAL_MAGIC: [u8; 2] = *b"ND";

/// The obfuscation key and where it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObfuscationKey {
    /// Value of `C[2]`.
    pub position: usize,
    /// Value of `C[position]`.
    pub key: u8,
}

/// Read the key pointer and the key it points at.
///
/// No check is made that the key is plausible; a wrong key surfaces later
/// as an archive error.
pub fn locate_key(container: &[u8]) -> Result<ObfuscationKey> {
    if container.len() < HEADER_LEN {
        return Err(NdocError::truncated(
            Stage::LocateKey,
            HEADER_LEN,
            container.len(),
        ));
    }

    let position = container[KEY_POINTER_OFFSET] as usize;
    let key = *container
        .get(position)
        .ok_or_else(|| NdocError::truncated(Stage::LocateKey, position + 1, container.len()))?;

    Ok(ObfuscationKey { position, key })
}

/// Overwrite the disguise header with the archive signature.
///
/// Returns the header bytes that were replaced.
pub fn normalize_header(container: &mut [u8]) -> Result<[u8; HEADER_LEN]> {
    let available = container.len();
    let header: &mut [u8; HEADER_LEN] = container
        .get_mut(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| NdocError::truncated(Stage::NormalizeHeader, HEADER_LEN, available))?;

    Ok(std::mem::replace(header, ARCHIVE_SIGNATURE))
}

/// XOR the obfuscated region with `key`. Self-inverse.
pub fn deobfuscate(container: &mut [u8], key: u8) -> Result<()> {
    let available = container.len();
    let region = container
        .get_mut(OBFUSCATED_REGION)
        .ok_or_else(|| NdocError::truncated(Stage::Deobfuscate, MIN_CONTAINER_LEN, available))?;

    for byte in region {
        *byte ^= key;
    }
    Ok(())
}

/// Build a container from a ZIP archive.
///
/// The disguise header is `"ND", 0x03, key`: the pointer at offset 2 names
/// offset 3, which holds the key.
pub fn seal(archive: &[u8], key: u8) -> Result<Vec<u8>> {
    if archive.len() < MIN_CONTAINER_LEN {
        return Err(NdocError::truncated(
            Stage::Seal,
            MIN_CONTAINER_LEN,
            archive.len(),
        ));
    }
    if archive[..HEADER_LEN] != ARCHIVE_SIGNATURE {
        return Err(NdocError::archive_msg(
            Stage::Seal,
            format!(
                "input does not start with a local file header (found {:02x?})",
                &archive[..HEADER_LEN]
            ),
        ));
    }

    let mut container = archive.to_vec();
    deobfuscate(&mut container, key)?;
    container[..HEADER_LEN].copy_from_slice(&[SEAL_MAGIC[0], SEAL_MAGIC[1], 3, key]);
    Ok(container)
}
