//! Multi-worker data loader
//!
//! Main interface for iterating batches out of a sample source.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::assign::assign;
use super::batch::Batch;
use super::source::SampleSource;
use super::worker::Worker;
use crate::error::{BenchError, Result};
use crate::metrics::LoaderMetrics;
use crate::runtime::BenchRuntime;

/// Configuration for the data loader
#[derive(Debug, Clone)]
pub struct DataLoaderConfig {
    /// Samples per batch
    pub batch_size: usize,
    /// Parallel workers (0 behaves as 1)
    pub num_workers: usize,
    /// Batches buffered per worker
    pub prefetch_factor: usize,
    /// Drop each worker's final partial batch
    pub drop_last: bool,
    /// Samples per work item for chunked datasets
    pub items_per_task: u64,
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            num_workers: 0,
            prefetch_factor: 2,
            drop_last: false,
            items_per_task: 256,
        }
    }
}

impl DataLoaderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(BenchError::InvalidConfig {
                reason: "batch_size must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Workers actually spawned
    pub fn effective_workers(&self) -> usize {
        self.num_workers.max(1)
    }

    /// Capacity of the batch channel
    pub fn channel_capacity(&self) -> usize {
        (self.effective_workers() * self.prefetch_factor).max(1)
    }
}

/// Multi-worker batch loader
///
/// Batches from different workers interleave in completion order.
/// Dropping the loader stops its workers.
pub struct DataLoader {
    receiver: mpsc::Receiver<Result<Batch>>,
    handles: Vec<JoinHandle<()>>,
    metrics: Arc<LoaderMetrics>,
    failed: bool,
}

impl DataLoader {
    /// Assign the source's work items and start the workers
    pub fn new(runtime: &BenchRuntime, source: SampleSource, config: DataLoaderConfig) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel(config.channel_capacity());
        let items = source.work_items(config.items_per_task);
        let num_workers = config.effective_workers();
        debug!(
            "Starting loader: {} items, {} workers, batch size {}",
            items.len(),
            num_workers,
            config.batch_size
        );

        let handles = assign(items, num_workers)
            .into_iter()
            .enumerate()
            .map(|(id, items)| {
                let worker = Worker {
                    id,
                    items: VecDeque::from(items),
                    source: source.clone(),
                    io: runtime.io_handle(),
                    sender: sender.clone(),
                    batch_size: config.batch_size,
                    drop_last: config.drop_last,
                };
                runtime.spawn_compute(worker.run())
            })
            .collect();

        Ok(Self {
            receiver,
            handles,
            metrics: Arc::new(LoaderMetrics::new()),
            failed: false,
        })
    }

    /// Get the next batch
    ///
    /// Returns `Ok(None)` once every worker has finished. The first worker
    /// error is returned once; the loader yields nothing after it.
    pub async fn next_batch(&mut self) -> Result<Option<Batch>> {
        if self.failed {
            return Ok(None);
        }

        let start = Instant::now();
        match self.receiver.recv().await {
            Some(Ok(batch)) => {
                self.metrics.batch_wait.observe_since(start);
                self.metrics.batches.inc();
                self.metrics.samples.inc_by(batch.len() as u64);
                self.metrics.bytes.inc_by(batch.byte_size());
                Ok(Some(batch))
            }
            Some(Err(e)) => {
                self.failed = true;
                self.stop();
                Err(e)
            }
            None => Ok(None),
        }
    }

    /// Drain every remaining batch, discarding contents
    pub async fn drain(&mut self) -> Result<u64> {
        let mut batches = 0;
        while self.next_batch().await?.is_some() {
            batches += 1;
        }
        Ok(batches)
    }

    pub fn metrics(&self) -> Arc<LoaderMetrics> {
        self.metrics.clone()
    }

    fn stop(&mut self) {
        self.receiver.close();
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl Drop for DataLoader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DataLoaderConfig::default();
        config.validate().unwrap();
        assert_eq!(config.effective_workers(), 1);
        assert_eq!(config.channel_capacity(), 2);
    }

    #[test]
    fn test_zero_prefetch_still_has_capacity() {
        let config = DataLoaderConfig {
            num_workers: 8,
            prefetch_factor: 0,
            ..Default::default()
        };
        assert_eq!(config.channel_capacity(), 1);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = DataLoaderConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BenchError::InvalidConfig { .. })));
    }
}
