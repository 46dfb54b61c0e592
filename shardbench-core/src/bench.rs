//! Loader timing harness
//!
//! Builds a fresh loader per worker count over the same source, drains it
//! and records the wall time. Batch contents are discarded unchecked.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::Result;
use crate::loader::{DataLoader, DataLoaderConfig, SampleSource};
use crate::runtime::BenchRuntime;

/// Outcome of draining one loader
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Requested worker count
    pub num_workers: usize,
    pub batch_size: usize,
    /// Wall time of the full iteration
    pub seconds: f64,
    pub batches: u64,
    pub samples: u64,
    pub bytes: u64,
    pub samples_per_sec: f64,
    /// Mean time `next_batch` waited on workers
    pub mean_batch_wait_secs: f64,
}

/// Every run for one batch size
#[derive(Debug, Clone, Serialize)]
pub struct BatchSizeRuns {
    pub batch_size: usize,
    pub runs: Vec<RunReport>,
}

impl BatchSizeRuns {
    /// Durations in worker-count order
    pub fn durations(&self) -> Vec<f64> {
        self.runs.iter().map(|r| r.seconds).collect()
    }
}

/// Drain one loader built from `config`, blocking until done
pub fn run_loader(runtime: &BenchRuntime, source: &SampleSource, config: DataLoaderConfig) -> Result<RunReport> {
    let num_workers = config.num_workers;
    let batch_size = config.batch_size;

    let start = Instant::now();
    let mut loader = DataLoader::new(runtime, source.clone(), config)?;
    runtime.block_on(loader.drain())?;
    let seconds = start.elapsed().as_secs_f64();

    let metrics = loader.metrics();
    debug!("Loader metrics:\n{}", metrics.render());
    let samples = metrics.samples.get();
    let report = RunReport {
        num_workers,
        batch_size,
        seconds,
        batches: metrics.batches.get(),
        samples,
        bytes: metrics.bytes.get(),
        samples_per_sec: if seconds > 0.0 { samples as f64 / seconds } else { 0.0 },
        mean_batch_wait_secs: metrics.batch_wait.mean_secs(),
    };

    info!(
        "workers={} batch_size={} {:.3}s ({} samples, {:.1} samples/s)",
        num_workers, batch_size, seconds, samples, report.samples_per_sec
    );
    Ok(report)
}

/// Time one full iteration per worker count
pub fn time_loader_reports(
    runtime: &BenchRuntime,
    source: &SampleSource,
    batch_size: usize,
    worker_counts: &[usize],
) -> Result<Vec<RunReport>> {
    worker_counts
        .iter()
        .map(|&num_workers| {
            let config = DataLoaderConfig {
                batch_size,
                num_workers,
                ..Default::default()
            };
            run_loader(runtime, source, config)
        })
        .collect()
}

/// Seconds per full iteration, aligned with `worker_counts`
pub fn time_loader(
    runtime: &BenchRuntime,
    source: &SampleSource,
    batch_size: usize,
    worker_counts: &[usize],
) -> Result<Vec<f64>> {
    Ok(time_loader_reports(runtime, source, batch_size, worker_counts)?
        .into_iter()
        .map(|r| r.seconds)
        .collect())
}

/// Repeat the worker-count timing for each batch size
pub fn sweep(
    runtime: &BenchRuntime,
    source: &SampleSource,
    batch_sizes: &[usize],
    worker_counts: &[usize],
) -> Result<Vec<BatchSizeRuns>> {
    batch_sizes
        .iter()
        .map(|&batch_size| {
            Ok(BatchSizeRuns {
                batch_size,
                runs: time_loader_reports(runtime, source, batch_size, worker_counts)?,
            })
        })
        .collect()
}
