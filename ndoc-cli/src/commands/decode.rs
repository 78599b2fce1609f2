//! Decode command implementation.

use ndoc_pipeline::{
    ByteSource, CancelToken, ConformancePolicy, DecodeBackend, DecodeOptions, LocalBackend,
    PayloadFormat, RemoteBackend,
};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

/// Arguments of `ndoc decode`.
pub struct DecodeArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub entry: Option<String>,
    pub format: Option<PayloadFormat>,
    pub lenient: bool,
    pub no_verify_crc: bool,
    pub config: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub remote: Option<String>,
}

impl DecodeArgs {
    /// Options from the config file, if any, with flags applied on top.
    pub fn options(&self) -> Result<DecodeOptions, Box<dyn Error>> {
        let mut options = match &self.config {
            Some(path) => DecodeOptions::from_json(&std::fs::read_to_string(path)?)?,
            None => DecodeOptions::default(),
        };

        if let Some(entry) = &self.entry {
            options.entry_name = entry.clone();
        }
        if let Some(format) = self.format {
            options.stream_format = format;
        }
        if self.lenient {
            options.conformance = ConformancePolicy::Lenient;
        }
        if self.no_verify_crc {
            options.verify_crc = false;
        }
        if let Some(dir) = &self.scratch_dir {
            options.scratch_dir = Some(dir.clone());
        }
        Ok(options)
    }
}

pub async fn cmd_decode(args: &DecodeArgs) -> Result<(), Box<dyn Error>> {
    let options = args.options()?;
    let backend: Box<dyn DecodeBackend> = match &args.remote {
        Some(url) => Box::new(RemoteBackend::new(url.clone())),
        None => Box::new(LocalBackend::new(options)),
    };

    let cancel = CancelToken::new();
    let result = backend
        .decode(ByteSource::from(args.input.as_path()), &cancel)
        .await?;
    info!(backend = backend.name(), len = result.len(), "decode finished");

    let json = result.to_json()?;
    match &args.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DecodeArgs {
        DecodeArgs {
            input: PathBuf::from("in.ndoc"),
            output: None,
            entry: None,
            format: None,
            lenient: false,
            no_verify_crc: false,
            config: None,
            scratch_dir: None,
            remote: None,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("ndoc.json");
        std::fs::write(
            &config,
            r#"{"entry_name": "from-config.pb", "stream_format": "zlib", "max_output_size": 512}"#,
        )
        .unwrap();

        let mut args = args();
        args.config = Some(config);
        args.format = Some(PayloadFormat::Raw);
        args.lenient = true;

        let options = args.options().unwrap();
        assert_eq!(options.entry_name, "from-config.pb");
        assert_eq!(options.stream_format, PayloadFormat::Raw);
        assert_eq!(options.conformance, ConformancePolicy::Lenient);
        assert_eq!(options.max_output_size, 512);
        assert!(options.verify_crc);
    }

    #[test]
    fn test_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("ndoc.json");
        std::fs::write(&config, "{not json").unwrap();

        let mut args = args();
        args.config = Some(config);
        assert!(args.options().is_err());
    }

    #[tokio::test]
    async fn test_decode_to_file() {
        use ndoc_archive::zip::{ZipMethod, build_zip};
        use ndoc_deflate::deflate_stored;

        let mut entry = vec![0u8; 16];
        entry.extend_from_slice(&deflate_stored(&[1, 2, 3, 4, 5]));
        let archive = build_zip([("document.word.pb", entry.as_slice())], ZipMethod::Deflate).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.ndoc");
        let output = dir.path().join("doc.json");
        std::fs::write(&input, ndoc_pipeline::seal(&archive, 0x7F).unwrap()).unwrap();

        let mut args = args();
        args.input = input;
        args.output = Some(output.clone());
        args.scratch_dir = Some(dir.path().to_path_buf());
        cmd_decode(&args).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(output).unwrap(),
            r#"{"serializedData":[1,2,3,4,5]}"#
        );
    }
}
