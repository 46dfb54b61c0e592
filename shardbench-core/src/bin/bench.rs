//! Data loader benchmark binary

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shardbench_core::bench::{sweep, BatchSizeRuns};
use shardbench_core::loader::SampleSource;
use shardbench_core::runtime::{BenchRuntime, RuntimeConfig};
use shardbench_core::storage::{S3Config, Storage};
use shardbench_core::DEFAULT_WORKER_COUNTS;

#[derive(Parser)]
#[command(name = "bench", about = "Time full data-loader iterations per worker count")]
struct Cli {
    #[command(subcommand)]
    format: Format,
    /// Batch sizes to sweep
    #[arg(long, global = true, value_delimiter = ',', default_value = "16,64")]
    batch_sizes: Vec<usize>,
    /// Worker counts to time, in output order
    #[arg(long, global = true, value_delimiter = ',')]
    workers: Option<Vec<usize>>,
    /// Threads serving storage requests
    #[arg(long, global = true, env = "BENCH_IO_THREADS")]
    io_threads: Option<usize>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Format {
    /// Tar shards (directory or s3://bucket/prefix)
    Webdataset { location: String },
    /// Chunked dataset (directory or s3://bucket/prefix)
    Hub { location: String },
}

fn print_table(results: &[BatchSizeRuns]) {
    println!(
        "{:>10} {:>8} {:>10} {:>10} {:>14}",
        "batch", "workers", "seconds", "samples", "samples/s"
    );
    for result in results {
        for run in &result.runs {
            println!(
                "{:>10} {:>8} {:>10.3} {:>10} {:>14.1}",
                result.batch_size, run.num_workers, run.seconds, run.samples, run.samples_per_sec
            );
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut runtime_config = RuntimeConfig::default();
    if let Some(io_threads) = cli.io_threads {
        runtime_config.io_threads = io_threads;
    }
    let runtime = BenchRuntime::new(runtime_config)?;

    let s3 = S3Config::from_env();
    let source = runtime.block_on(async {
        match &cli.format {
            Format::Webdataset { location } => {
                let storage = Arc::new(Storage::from_location_str(location, s3)?);
                SampleSource::open_shards(storage).await
            }
            Format::Hub { location } => {
                let storage = Arc::new(Storage::from_location_str(location, s3)?);
                SampleSource::open_hub(storage).await
            }
        }
    })?;
    if let Some(len) = source.len_hint() {
        info!("Benchmarking {} samples", len);
    }

    let workers = cli
        .workers
        .clone()
        .unwrap_or_else(|| DEFAULT_WORKER_COUNTS.to_vec());
    let results = sweep(&runtime, &source, &cli.batch_sizes, &workers)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_table(&results);
    }

    drop(source);
    runtime.shutdown();
    Ok(())
}
