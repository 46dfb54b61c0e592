//! Chunked dataset preparation binary

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shardbench_core::compression::{CompressionAlgorithm, CompressionConfig};
use shardbench_core::hub::{copy_dataset, ingest_image_folder, reference_dataset, HubWriterConfig};
use shardbench_core::source::ImageFolder;
use shardbench_core::storage::{S3Config, Storage};
use shardbench_core::BenchError;

#[derive(Parser)]
#[command(name = "hub-prepare", about = "Prepare chunked datasets for benchmarking")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy a dataset to a new location, or reference it in place
    Copy {
        /// Source location (directory or s3://bucket/prefix)
        src: String,
        /// Destination location, unused with --reference
        #[arg(required_unless_present = "reference")]
        dst: Option<String>,
        /// Use the source where it lives instead of copying
        #[arg(long)]
        reference: bool,
        /// Replace an existing dataset at the destination
        #[arg(long)]
        overwrite: bool,
    },
    /// Convert an image-classification directory into a chunked dataset
    Ingest {
        /// Dataset root with one subdirectory per class
        #[arg(long, env = "HUB_INPUT")]
        input: PathBuf,
        /// Destination location
        dst: String,
        /// Uncompressed chunk capacity in bytes
        #[arg(long, default_value_t = 16_000_000)]
        chunk_size: usize,
        /// none, lz4 or zstd
        #[arg(long, default_value = "lz4")]
        compression: CompressionAlgorithm,
        #[arg(long)]
        overwrite: bool,
    },
}

async fn run(command: Command) -> Result<(), BenchError> {
    let s3 = S3Config::from_env();
    match command {
        Command::Copy {
            src,
            dst,
            reference,
            overwrite,
        } => {
            let src = Storage::from_location_str(&src, s3.clone())?;
            if reference {
                let dataset = reference_dataset(Arc::new(src)).await?;
                info!("Dataset ready in place with {} samples", dataset.len());
            } else {
                let dst = dst.ok_or_else(|| BenchError::InvalidConfig {
                    reason: "copy needs a destination unless --reference is given".into(),
                })?;
                let dst = Storage::from_location_str(&dst, s3)?;
                let report = copy_dataset(&src, &dst, overwrite).await?;
                info!("Copied {} objects ({} bytes)", report.objects, report.bytes);
            }
        }
        Command::Ingest {
            input,
            dst,
            chunk_size,
            compression,
            overwrite,
        } => {
            let folder = ImageFolder::scan(&input)?;
            let dst = Storage::from_location_str(&dst, s3)?;
            let config = HubWriterConfig {
                chunk_size,
                compression: CompressionConfig {
                    algorithm: compression,
                    ..Default::default()
                },
                overwrite,
            };
            let meta = ingest_image_folder(&folder, &dst, config).await?;
            info!("Ingested {} samples into {}", meta.num_samples, dst.location());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_missing_dir() => {
            eprintln!("{}", e);
            exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_needs_no_destination() {
        let cli = Cli::try_parse_from(["hub-prepare", "copy", "/data/hub", "--reference"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Copy { dst: None, reference: true, .. }
        ));
    }

    #[test]
    fn test_copy_requires_destination() {
        assert!(Cli::try_parse_from(["hub-prepare", "copy", "/data/hub"]).is_err());

        let cli = Cli::try_parse_from(["hub-prepare", "copy", "/data/hub", "s3://bucket/hub"]).unwrap();
        match cli.command {
            Command::Copy { dst, reference, .. } => {
                assert_eq!(dst.as_deref(), Some("s3://bucket/hub"));
                assert!(!reference);
            }
            Command::Ingest { .. } => panic!("parsed as ingest"),
        }
    }

    #[tokio::test]
    async fn test_copy_without_destination_is_config_error() {
        let command = Command::Copy {
            src: "/nonexistent/hub".into(),
            dst: None,
            reference: false,
            overwrite: false,
        };
        assert!(matches!(run(command).await, Err(BenchError::InvalidConfig { .. })));
    }
}
