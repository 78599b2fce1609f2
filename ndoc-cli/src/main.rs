//! ndoc - decode NDOC disguised-archive documents.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use commands::{DecodeArgs, cmd_decode, cmd_inspect, cmd_seal, parse_key};
use ndoc_pipeline::{NdocError, PayloadFormat};
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ndoc")]
#[command(author, version, about = "Decode NDOC disguised-archive documents")]
#[command(long_about = "
Decodes NDOC containers: ZIP archives whose signature has been replaced and
whose first 64 bytes are XOR-ed with a key stored inside the header.

Examples:
  ndoc decode report.ndoc
  ndoc decode report.ndoc -o report.json --lenient
  ndoc decode report.ndoc --remote http://localhost:8080/convert
  ndoc inspect report.ndoc --json
  ndoc seal archive.zip report.ndoc --key 0x7F
")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a container and print {"serializedData": [...]}
    #[command(alias = "d")]
    Decode {
        /// Container file
        input: PathBuf,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Entry holding the payload
        #[arg(short, long)]
        entry: Option<String>,

        /// Payload framing (auto, raw, zlib)
        #[arg(short, long)]
        format: Option<PayloadFormat>,

        /// Warn instead of failing when the archive is inconsistent
        #[arg(long)]
        lenient: bool,

        /// Skip CRC-32 verification of the entry
        #[arg(long)]
        no_verify_crc: bool,

        /// JSON file with decode options; flags override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Parent directory for scratch space
        #[arg(long)]
        scratch_dir: Option<PathBuf>,

        /// Send the container to a conversion service instead
        #[arg(long)]
        remote: Option<String>,
    },

    /// Show the header, key and archive entries of a container
    #[command(alias = "i")]
    Inspect {
        /// Container file
        input: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Disguise a ZIP archive as a container
    Seal {
        /// ZIP archive
        archive: PathBuf,

        /// Container to write
        output: PathBuf,

        /// Obfuscation key, decimal or 0x-prefixed hex
        #[arg(short, long, default_value = "0x7F", value_parser = parse_key)]
        key: u8,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Decode {
            input,
            output,
            entry,
            format,
            lenient,
            no_verify_crc,
            config,
            scratch_dir,
            remote,
        } => {
            let args = DecodeArgs {
                input,
                output,
                entry,
                format,
                lenient,
                no_verify_crc,
                config,
                scratch_dir,
                remote,
            };
            cmd_decode(&args).await
        }
        Commands::Inspect { input, json } => cmd_inspect(&input, json),
        Commands::Seal {
            archive,
            output,
            key,
        } => cmd_seal(&archive, &output, key),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(e.as_ref()));
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 1 when the input is at fault, 2 for everything else.
fn exit_code(err: &(dyn Error + 'static)) -> i32 {
    if let Some(e) = err.downcast_ref::<NdocError>() {
        return if e.is_input_error() { 1 } else { 2 };
    }
    if err.is::<serde_json::Error>() {
        return 1;
    }
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ndoc_pipeline::Stage;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_decode_flags() {
        let cli = Cli::try_parse_from([
            "ndoc", "-vv", "decode", "in.ndoc", "--format", "zlib", "--lenient", "-e", "x.pb",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Decode {
                format,
                lenient,
                entry,
                ..
            } => {
                assert_eq!(format, Some(PayloadFormat::Zlib));
                assert!(lenient);
                assert_eq!(entry.as_deref(), Some("x.pb"));
            }
            _ => panic!("expected decode"),
        }

        assert!(Cli::try_parse_from(["ndoc", "decode", "in", "--format", "gzip"]).is_err());
    }

    #[test]
    fn test_seal_key_parsing() {
        let cli = Cli::try_parse_from(["ndoc", "seal", "a.zip", "b.ndoc", "--key", "0x10"]).unwrap();
        assert!(matches!(cli.command, Commands::Seal { key: 0x10, .. }));

        let cli = Cli::try_parse_from(["ndoc", "seal", "a.zip", "b.ndoc"]).unwrap();
        assert!(matches!(cli.command, Commands::Seal { key: 0x7F, .. }));

        assert!(Cli::try_parse_from(["ndoc", "seal", "a.zip", "b.ndoc", "-k", "300"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        let input: Box<dyn Error> = Box::new(NdocError::truncated(Stage::LocateKey, 4, 1));
        assert_eq!(exit_code(input.as_ref()), 1);

        let internal: Box<dyn Error> = Box::new(NdocError::cancelled(Stage::Extract));
        assert_eq!(exit_code(internal.as_ref()), 2);

        let io: Box<dyn Error> = Box::new(std::io::Error::other("disk"));
        assert_eq!(exit_code(io.as_ref()), 2);
    }
}
