//! Seal command implementation.

use ndoc_pipeline::seal;
use std::error::Error;
use std::path::Path;

/// Parse a key given as decimal or `0x`-prefixed hex.
pub fn parse_key(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid key '{}': {}", s, e))
}

pub fn cmd_seal(archive: &Path, output: &Path, key: u8) -> Result<(), Box<dyn Error>> {
    let bytes = std::fs::read(archive)?;
    let container = seal(&bytes, key)?;
    std::fs::write(output, &container)?;

    println!(
        "Sealed {} -> {} (key {:#04x}, {} bytes)",
        archive.display(),
        output.display(),
        key,
        container.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndoc_archive::zip::{ZipMethod, build_zip};

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("0x7F"), Ok(0x7F));
        assert_eq!(parse_key("0Xff"), Ok(0xFF));
        assert_eq!(parse_key("16"), Ok(16));
        assert!(parse_key("0x100").is_err());
        assert!(parse_key("key").is_err());
    }

    #[test]
    fn test_seal_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let zip = dir.path().join("a.zip");
        let out = dir.path().join("a.ndoc");
        std::fs::write(
            &zip,
            build_zip([("document.word.pb", &[1u8; 80][..])], ZipMethod::Deflate).unwrap(),
        )
        .unwrap();

        cmd_seal(&zip, &out, 0x20).unwrap();
        let info = ndoc_pipeline::inspect(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(info.key.key, 0x20);
        assert_eq!(info.entries[0].size, 80);
    }

    #[test]
    fn test_seal_rejects_short_input() {
        let dir = tempfile::tempdir().unwrap();
        let zip = dir.path().join("tiny.zip");
        std::fs::write(&zip, b"PK\x03\x04").unwrap();
        assert!(cmd_seal(&zip, &dir.path().join("out"), 1).is_err());
    }
}
