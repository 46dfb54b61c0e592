//! Loader worker
//!
//! Runs on the compute runtime. Fetches its work items through the I/O
//! runtime, decodes them and sends full batches to the loader.

use std::collections::VecDeque;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

use super::batch::Batch;
use super::source::{SampleSource, ShardSpec, WorkItem};
use crate::error::{BenchError, Result};
use crate::shard::read_samples;

/// One loader worker and the items assigned to it
pub(crate) struct Worker {
    pub id: usize,
    pub items: VecDeque<WorkItem>,
    pub source: SampleSource,
    pub io: Handle,
    pub sender: mpsc::Sender<Result<Batch>>,
    pub batch_size: usize,
    pub drop_last: bool,
}

impl Worker {
    /// Run the worker loop until its items are exhausted, an item fails,
    /// or the loader is dropped
    pub async fn run(mut self) {
        debug!("Worker {} starting with {} items", self.id, self.items.len());

        let mut pending = Batch::with_capacity(self.batch_size);
        while let Some(item) = self.items.pop_front() {
            let loaded = match self.load(item).await {
                Ok(loaded) => loaded,
                Err(e) => {
                    debug!("Worker {} failed: {}", self.id, e);
                    let _ = self.sender.send(Err(e)).await;
                    return;
                }
            };

            for (key, image, label) in loaded {
                pending.push(key, image, label);
                if pending.len() >= self.batch_size {
                    let full = std::mem::replace(&mut pending, Batch::with_capacity(self.batch_size));
                    if self.sender.send(Ok(full)).await.is_err() {
                        debug!("Worker {}: loader dropped, stopping", self.id);
                        return;
                    }
                }
            }
        }

        if !pending.is_empty() && !self.drop_last {
            let _ = self.sender.send(Ok(pending)).await;
        }
        debug!("Worker {} completed", self.id);
    }

    /// Fetch and decode one work item
    async fn load(&self, item: WorkItem) -> Result<Vec<(String, bytes::Bytes, u32)>> {
        match (item, &self.source) {
            (WorkItem::Shard(spec), SampleSource::Shards { storage, .. }) => {
                let storage = storage.clone();
                let key = spec.key.clone();
                let data = self.on_io(async move { storage.get_object(&key).await }).await?;
                self.decode_shard(&spec, &data)
            }
            (WorkItem::Range { start, end }, SampleSource::Hub { dataset }) => {
                let dataset = dataset.clone();
                let samples = self.on_io(async move { dataset.read_range(start, end).await }).await?;
                Ok(samples
                    .into_iter()
                    .map(|s| (s.index.to_string(), s.image, s.label))
                    .collect())
            }
            (item, _) => Err(BenchError::Internal {
                message: format!("work item {:?} does not match the loader source", item),
            }),
        }
    }

    fn decode_shard(&self, spec: &ShardSpec, data: &bytes::Bytes) -> Result<Vec<(String, bytes::Bytes, u32)>> {
        spec.verify(data)?;
        let samples = read_samples(&spec.key, data)?;
        debug!(
            "Worker {} decoded shard {} ({} bytes, {} samples)",
            self.id,
            spec.id,
            data.len(),
            samples.len()
        );
        Ok(samples.into_iter().map(|s| (s.key, s.image, s.label)).collect())
    }

    /// Run a storage request on the I/O runtime
    async fn on_io<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.io.spawn(future).await.map_err(|e| BenchError::Internal {
            message: format!("I/O task failed: {}", e),
        })?
    }
}
