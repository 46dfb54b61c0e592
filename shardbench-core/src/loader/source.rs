//! What a loader reads from
//!
//! A source is either a set of tar shards or an opened chunked dataset.
//! Both are cheap to clone and shared read-only by every worker.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{BenchError, Result};
use crate::hub::HubDataset;
use crate::shard::ShardIndex;
use crate::storage::Storage;

/// Suffix of shard index objects
const INDEX_SUFFIX: &str = "-index.json";

/// A tar shard to be loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSpec {
    /// Shard position in the dataset
    pub id: u32,
    /// Object key in storage
    pub key: String,
    /// Expected CRC32C of the whole object
    pub expected_crc32c: Option<u32>,
    /// Samples in the shard, when an index says so
    pub sample_count: Option<u64>,
}

impl ShardSpec {
    pub fn new(id: u32, key: impl Into<String>) -> Self {
        Self {
            id,
            key: key.into(),
            expected_crc32c: None,
            sample_count: None,
        }
    }

    pub fn with_checksum(mut self, crc32c: u32) -> Self {
        self.expected_crc32c = Some(crc32c);
        self
    }

    pub fn with_sample_count(mut self, count: u64) -> Self {
        self.sample_count = Some(count);
        self
    }

    /// Check fetched bytes against the expected checksum, if any
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        if let Some(expected) = self.expected_crc32c {
            let actual = crc32c::crc32c(data);
            if actual != expected {
                return Err(BenchError::ChecksumMismatch {
                    key: self.key.clone(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// One unit of work handed to a loader worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A whole tar shard
    Shard(ShardSpec),
    /// Samples `[start, end)` of a chunked dataset
    Range { start: u64, end: u64 },
}

/// Dataset a loader iterates
#[derive(Clone)]
pub enum SampleSource {
    Shards {
        storage: Arc<Storage>,
        shards: Arc<Vec<ShardSpec>>,
    },
    Hub {
        dataset: Arc<HubDataset>,
    },
}

impl SampleSource {
    /// Open a directory or bucket of tar shards
    ///
    /// Uses the shard index when one is present, so checksums get verified.
    /// Otherwise every `*.tar` object is loaded, in key order.
    pub async fn open_shards(storage: Arc<Storage>) -> Result<Self> {
        let keys = storage.list_objects().await?;
        let index_keys: Vec<&String> = keys.iter().filter(|k| k.ends_with(INDEX_SUFFIX)).collect();

        let shards = match index_keys.as_slice() {
            [index_key] => {
                let index = ShardIndex::from_json(&storage.get_object(index_key).await?)?;
                debug!("Loaded shard index {} ({} shards)", index_key, index.shards.len());
                index
                    .shards
                    .iter()
                    .map(|s| {
                        ShardSpec::new(s.shard_id, s.object_key.clone())
                            .with_checksum(s.crc32c)
                            .with_sample_count(s.sample_count)
                    })
                    .collect()
            }
            found => {
                if found.len() > 1 {
                    warn!(
                        "{} shard indexes at {}, loading every tar shard unverified",
                        found.len(),
                        storage.location()
                    );
                }
                keys.iter()
                    .filter(|k| k.ends_with(".tar"))
                    .enumerate()
                    .map(|(id, key)| ShardSpec::new(id as u32, key.clone()))
                    .collect()
            }
        };

        Ok(Self::from_shards(storage, shards))
    }

    pub fn from_shards(storage: Arc<Storage>, shards: Vec<ShardSpec>) -> Self {
        SampleSource::Shards {
            storage,
            shards: Arc::new(shards),
        }
    }

    /// Open a chunked dataset
    pub async fn open_hub(storage: Arc<Storage>) -> Result<Self> {
        let dataset = HubDataset::open(storage).await?;
        Ok(SampleSource::Hub {
            dataset: Arc::new(dataset),
        })
    }

    /// Number of samples, when known without reading the data
    pub fn len_hint(&self) -> Option<u64> {
        match self {
            SampleSource::Shards { shards, .. } => shards.iter().map(|s| s.sample_count).sum(),
            SampleSource::Hub { dataset } => Some(dataset.len()),
        }
    }

    /// Split the source into work items
    pub fn work_items(&self, items_per_task: u64) -> Vec<WorkItem> {
        match self {
            SampleSource::Shards { shards, .. } => shards.iter().cloned().map(WorkItem::Shard).collect(),
            SampleSource::Hub { dataset } => {
                let step = items_per_task.max(1);
                let len = dataset.len();
                (0..len)
                    .step_by(step as usize)
                    .map(|start| WorkItem::Range {
                        start,
                        end: (start + step).min(len),
                    })
                    .collect()
            }
        }
    }
}
