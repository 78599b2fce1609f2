//! Decode options.

use crate::container::DEFAULT_ENTRY_NAME;
use ndoc_deflate::{DEFAULT_OUTPUT_LIMIT, StreamFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How to react when the archive's local headers and central directory
/// disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConformancePolicy {
    /// Reject the archive.
    #[default]
    Strict,
    /// Log a warning and carry on, walking local headers if the central
    /// directory is unusable.
    Lenient,
}

impl FromStr for ConformancePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown conformance policy '{}'", other)),
        }
    }
}

impl fmt::Display for ConformancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

/// Framing of the compressed payload after the sub-header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// zlib when the payload starts with a valid zlib header, raw otherwise.
    #[default]
    Auto,
    /// Raw DEFLATE.
    Raw,
    /// zlib-wrapped DEFLATE.
    Zlib,
}

impl From<PayloadFormat> for StreamFormat {
    fn from(format: PayloadFormat) -> Self {
        match format {
            PayloadFormat::Auto => StreamFormat::Auto,
            PayloadFormat::Raw => StreamFormat::Raw,
            PayloadFormat::Zlib => StreamFormat::Zlib,
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "raw" | "deflate" => Ok(Self::Raw),
            "zlib" => Ok(Self::Zlib),
            other => Err(format!("unknown payload format '{}'", other)),
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Raw => write!(f, "raw"),
            Self::Zlib => write!(f, "zlib"),
        }
    }
}

/// Options for one decode.
///
/// Missing fields take their defaults when deserializing, so a config file
/// only needs the keys it changes:
///
/// ```
/// use ndoc_pipeline::{ConformancePolicy, DecodeOptions};
///
/// let options = DecodeOptions::from_json(r#"{"conformance": "lenient"}"#).unwrap();
/// assert_eq!(options.conformance, ConformancePolicy::Lenient);
/// assert_eq!(options.entry_name, "document.word.pb");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Archive entry holding the payload.
    pub entry_name: String,
    /// Payload framing.
    pub stream_format: PayloadFormat,
    /// Conformance policy.
    pub conformance: ConformancePolicy,
    /// Verify the entry's CRC-32 after extraction.
    pub verify_crc: bool,
    /// Cap on any decompressed buffer, in bytes.
    pub max_output_size: usize,
    /// Parent directory for per-request scratch directories; the system
    /// temp directory when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            entry_name: DEFAULT_ENTRY_NAME.to_string(),
            stream_format: PayloadFormat::Auto,
            conformance: ConformancePolicy::Strict,
            verify_crc: true,
            max_output_size: DEFAULT_OUTPUT_LIMIT,
            scratch_dir: None,
        }
    }
}

impl DecodeOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Set the entry name.
    pub fn with_entry_name(mut self, name: impl Into<String>) -> Self {
        self.entry_name = name.into();
        self
    }

    /// Set the payload framing.
    pub fn with_stream_format(mut self, format: PayloadFormat) -> Self {
        self.stream_format = format;
        self
    }

    /// Set the conformance policy.
    pub fn with_conformance(mut self, policy: ConformancePolicy) -> Self {
        self.conformance = policy;
        self
    }

    /// Enable or disable CRC-32 verification.
    pub fn with_verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Set the decompressed size cap.
    pub fn with_max_output_size(mut self, limit: usize) -> Self {
        self.max_output_size = limit;
        self
    }

    /// Set the scratch parent directory.
    pub fn with_scratch_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.scratch_dir = Some(dir.as_ref().to_path_buf());
        self
    }
}
