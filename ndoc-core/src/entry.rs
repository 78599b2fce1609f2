//! Archive entry metadata.

/// Compression method used for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMethod {
    /// No compression (ZIP method 0).
    #[default]
    Stored,
    /// DEFLATE compression (ZIP method 8).
    Deflate,
    /// Any other ZIP method id.
    Unknown(u16),
}

impl CompressionMethod {
    /// Create from a ZIP method id.
    pub fn from_zip(value: u16) -> Self {
        match value {
            0 => Self::Stored,
            8 => Self::Deflate,
            _ => Self::Unknown(value),
        }
    }

    /// The ZIP method id.
    pub fn to_zip(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflate => 8,
            Self::Unknown(id) => id,
        }
    }

    /// Get the method name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stored => "Stored",
            Self::Deflate => "Deflate",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "Unknown({})", id),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// A member of a ZIP archive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    /// Name as stored in the archive.
    pub name: String,
    /// Compression method.
    pub method: CompressionMethod,
    /// General purpose bit flag.
    pub flags: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the stored (possibly compressed) data.
    pub compressed_size: u64,
    /// Uncompressed size.
    pub size: u64,
    /// Offset of the local file header.
    pub header_offset: u64,
    /// Offset of the member data (just past the local header).
    pub data_offset: u64,
}

impl Entry {
    /// Whether the name denotes a directory.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Compression ratio as a percentage saved (0 for empty entries).
    pub fn compression_ratio(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        (1.0 - self.compressed_size as f64 / self.size as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_zip_ids() {
        assert_eq!(CompressionMethod::from_zip(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_zip(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from_zip(14), CompressionMethod::Unknown(14));
        assert_eq!(CompressionMethod::Unknown(14).to_zip(), 14);
        assert_eq!(CompressionMethod::Deflate.to_string(), "Deflate");
        assert_eq!(CompressionMethod::Unknown(99).to_string(), "Unknown(99)");
    }

    #[test]
    fn test_entry_helpers() {
        let entry = Entry {
            name: "docs/".to_string(),
            size: 200,
            compressed_size: 50,
            ..Entry::default()
        };
        assert!(entry.is_dir());
        assert!((entry.compression_ratio() - 75.0).abs() < f64::EPSILON);
        assert_eq!(Entry::default().compression_ratio(), 0.0);
    }
}
