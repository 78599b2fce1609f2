//! Inspect command implementation.

use ndoc_pipeline::{Inspection, inspect};
use std::error::Error;
use std::path::Path;

pub fn cmd_inspect(input: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    let bytes = std::fs::read(input)?;
    let inspection = inspect(&bytes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
    } else {
        print!("{}", render(input, &inspection));
    }
    Ok(())
}

fn render(input: &Path, info: &Inspection) -> String {
    let mut out = String::new();
    let header: Vec<String> = info
        .original_header
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();

    out.push_str("Container Information\n");
    out.push_str("=====================\n");
    out.push_str(&format!("File: {}\n", input.display()));
    out.push_str(&format!("Size: {} bytes\n", info.container_len));
    out.push_str(&format!("Header: {}\n", header.join(" ")));
    out.push_str(&format!(
        "Key: {:#04x} (offset {})\n",
        info.key.key, info.key.position
    ));

    let summary = &info.conformance;
    let verdict = if summary.conformant {
        "conformant"
    } else {
        "NOT conformant"
    };
    out.push_str(&format!(
        "Conformance: {} ({}, {} checked)\n",
        verdict, summary.source, summary.checked
    ));
    for mismatch in &summary.mismatches {
        out.push_str(&format!("  ! {}\n", mismatch));
    }

    out.push('\n');
    out.push_str(&format!(
        "{:>10}  {:>10}  {:<8}  {:>8}  Name\n",
        "Size", "Compressed", "Method", "CRC32"
    ));
    out.push_str(&format!("{}\n", "-".repeat(60)));
    for entry in &info.entries {
        out.push_str(&format!(
            "{:>10}  {:>10}  {:<8}  {:08x}  {}\n",
            entry.size, entry.compressed_size, entry.method, entry.crc32, entry.name
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndoc_archive::zip::{ZipMethod, build_zip};

    #[test]
    fn test_render() {
        let archive = build_zip(
            [("document.word.pb", &[0u8; 70][..])],
            ZipMethod::Stored,
        )
        .unwrap();
        let info = inspect(&ndoc_pipeline::seal(&archive, 0x7F).unwrap()).unwrap();
        let text = render(Path::new("doc.ndoc"), &info);

        assert!(text.contains("Header: 4e 44 03 7f"));
        assert!(text.contains("Key: 0x7f (offset 3)"));
        assert!(text.contains("Conformance: conformant (central directory, 1 checked)"));
        assert!(text.contains("document.word.pb"));
    }
}
