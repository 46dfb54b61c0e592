//! Shard index file
//!
//! Written next to the shards so loaders can enumerate them and verify
//! checksums without listing the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Index of every shard written by one sharding run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardIndex {
    /// Dataset name
    pub name: String,
    /// Split name (train, val, ...)
    pub split: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Class names in label order
    pub classes: Vec<String>,
    /// Total samples across all shards
    pub total_samples: u64,
    /// Per-shard metadata, in shard order
    pub shards: Vec<ShardMetadata>,
}

/// Metadata for a single shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardMetadata {
    /// Shard number
    pub shard_id: u32,
    /// Object key relative to the dataset location
    pub object_key: String,
    /// Size in bytes
    pub byte_size: u64,
    /// Number of samples
    pub sample_count: u64,
    /// CRC32C checksum of the whole file
    pub crc32c: u32,
}

impl ShardIndex {
    pub fn new(name: impl Into<String>, split: impl Into<String>, classes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            split: split.into(),
            created_at: Utc::now(),
            classes,
            total_samples: 0,
            shards: Vec::new(),
        }
    }

    /// Index file name for a dataset name and split
    pub fn file_name(name: &str, split: &str) -> String {
        format!("{}-{}-index.json", name, split)
    }

    /// Record a closed shard
    pub fn push(&mut self, shard: ShardMetadata) {
        self.total_samples += shard.sample_count;
        self.shards.push(shard);
    }

    pub fn total_bytes(&self) -> u64 {
        self.shards.iter().map(|s| s.byte_size).sum()
    }

    /// Check the index is internally consistent
    pub fn validate(&self) -> Result<()> {
        let counted: u64 = self.shards.iter().map(|s| s.sample_count).sum();
        if counted != self.total_samples {
            return Err(BenchError::ManifestInvalid {
                reason: format!(
                    "total_samples is {} but shards hold {}",
                    self.total_samples, counted
                ),
            });
        }

        for (expected, shard) in self.shards.iter().enumerate() {
            if shard.shard_id != expected as u32 {
                return Err(BenchError::ManifestInvalid {
                    reason: format!("shard {} listed at position {}", shard.shard_id, expected),
                });
            }
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let index: Self = serde_json::from_slice(data)?;
        index.validate()?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(id: u32, count: u64) -> ShardMetadata {
        ShardMetadata {
            shard_id: id,
            object_key: format!("ds-train-{:06}.tar", id),
            byte_size: 4096,
            sample_count: count,
            crc32c: 0,
        }
    }

    #[test]
    fn test_push_and_validate() {
        let mut index = ShardIndex::new("ds", "train", vec!["a".into()]);
        index.push(shard(0, 10));
        index.push(shard(1, 3));
        assert_eq!(index.total_samples, 13);
        assert_eq!(index.total_bytes(), 8192);
        index.validate().unwrap();

        let parsed = ShardIndex::from_json(&index.to_json().unwrap()).unwrap();
        assert_eq!(parsed.shards, index.shards);
    }

    #[test]
    fn test_validate_rejects_bad_total() {
        let mut index = ShardIndex::new("ds", "train", vec![]);
        index.push(shard(0, 10));
        index.total_samples = 11;
        assert!(matches!(index.validate(), Err(BenchError::ManifestInvalid { .. })));
    }
}
