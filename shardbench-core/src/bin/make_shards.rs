//! Tar shard writer binary

use clap::Parser;
use std::path::PathBuf;
use std::process::exit;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shardbench_core::shard::{write_shards, ShardWriterConfig};
use shardbench_core::source::ImageFolder;
use shardbench_core::{DEFAULT_MAX_SHARD_COUNT, DEFAULT_MAX_SHARD_SIZE};

/// Pack an image-classification directory into tar shards
#[derive(Parser)]
#[command(name = "make-shards")]
struct Args {
    /// Dataset root with one subdirectory per class
    #[arg(long, env = "SHARDS_INPUT")]
    input: PathBuf,
    /// Existing directory to write shards into
    #[arg(long, env = "SHARDS_OUTPUT")]
    output: PathBuf,
    /// Dataset name used in shard file names
    #[arg(long, default_value = "imagenet")]
    name: String,
    #[arg(long, default_value = "train")]
    split: String,
    /// Maximum shard size in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_SHARD_SIZE)]
    max_size: u64,
    /// Maximum samples per shard
    #[arg(long, default_value_t = DEFAULT_MAX_SHARD_COUNT)]
    max_count: u64,
    /// Shuffle seed, random when omitted
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = ShardWriterConfig {
        max_size: args.max_size,
        max_count: args.max_count,
    };
    let result = ImageFolder::scan(&args.input)
        .and_then(|folder| {
            info!(
                "Sharding {} images in {} classes from {}",
                folder.len(),
                folder.classes().len(),
                folder.root().display()
            );
            write_shards(&folder, &args.output, &args.name, &args.split, config, args.seed)
        });

    match result {
        Ok(index) => {
            info!(
                "Wrote {} samples into {} shards ({} bytes)",
                index.total_samples,
                index.shards.len(),
                index.total_bytes()
            );
            Ok(())
        }
        Err(e) if e.is_missing_dir() => {
            eprintln!("{}", e);
            exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
