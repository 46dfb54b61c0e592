//! Chunked store metadata
//!
//! `meta.json` is written last and acts as the commit marker: a location
//! without it holds no readable dataset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compression::CompressionAlgorithm;
use crate::error::{BenchError, Result};

/// Dataset metadata object key
pub const META_KEY: &str = "meta.json";

/// Tensor holding encoded image bytes
pub const IMAGES_TENSOR: &str = "images";

/// Tensor holding little-endian `u32` labels
pub const LABELS_TENSOR: &str = "labels";

/// Object key of a chunk
pub fn chunk_key(tensor: &str, chunk_id: u32) -> String {
    format!("{}/chunks/c{}", tensor, chunk_id)
}

/// Object key of a tensor's index map
pub fn index_map_key(tensor: &str) -> String {
    format!("{}/index_map.json", tensor)
}

/// Dataset-level metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubMeta {
    /// Format version
    pub version: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Number of samples
    pub num_samples: u64,
    /// Class names in label order
    pub classes: Vec<String>,
    /// Uncompressed chunk capacity in bytes
    pub chunk_size: u64,
    /// Algorithm every chunk was written with
    pub compression: CompressionAlgorithm,
    /// Per-tensor metadata
    pub tensors: Vec<TensorMeta>,
}

/// Metadata for one tensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorMeta {
    pub name: String,
    pub dtype: String,
    pub num_chunks: u32,
}

/// Where one sample's bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// First chunk holding the sample
    pub start_chunk: u32,
    /// Last chunk holding the sample (inclusive)
    pub end_chunk: u32,
    /// Offset of the first byte inside `start_chunk`
    pub start_byte: u64,
    /// Total byte length
    pub length: u64,
}

impl HubMeta {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn tensor(&self, name: &str) -> Result<&TensorMeta> {
        self.tensors
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| BenchError::ManifestInvalid {
                reason: format!("missing tensor {}", name),
            })
    }

    pub fn validate(&self) -> Result<()> {
        if self.version > Self::CURRENT_VERSION {
            return Err(BenchError::ManifestInvalid {
                reason: format!("unsupported version {}", self.version),
            });
        }
        if self.chunk_size == 0 {
            return Err(BenchError::ManifestInvalid {
                reason: "chunk_size is zero".into(),
            });
        }
        self.tensor(IMAGES_TENSOR)?;
        self.tensor(LABELS_TENSOR)?;
        Ok(())
    }

    /// Check an index map covers every sample and stays inside the tensor's chunks
    pub fn validate_index_map(&self, tensor: &str, entries: &[IndexEntry]) -> Result<()> {
        let meta = self.tensor(tensor)?;
        if entries.len() as u64 != self.num_samples {
            return Err(BenchError::ManifestInvalid {
                reason: format!(
                    "{} index map has {} entries for {} samples",
                    tensor,
                    entries.len(),
                    self.num_samples
                ),
            });
        }
        for (i, entry) in entries.iter().enumerate() {
            let in_bounds = entry.start_chunk <= entry.end_chunk && entry.end_chunk < meta.num_chunks;
            if entry.length > 0 && (!in_bounds || entry.start_byte >= self.chunk_size) {
                return Err(BenchError::ManifestInvalid {
                    reason: format!("{} entry {} points outside the stored chunks", tensor, i),
                });
            }
        }
        Ok(())
    }
}
