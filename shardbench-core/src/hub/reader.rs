//! Chunked store reader

use bytes::{Bytes, BytesMut};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use super::meta::{chunk_key, index_map_key, HubMeta, IndexEntry, IMAGES_TENSOR, LABELS_TENSOR, META_KEY};
use crate::compression::decompress_with;
use crate::error::{BenchError, Result};
use crate::storage::Storage;

/// One sample read back from the chunked store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSample {
    pub index: u64,
    pub image: Bytes,
    pub label: u32,
}

/// An opened chunked dataset
pub struct HubDataset {
    storage: Arc<Storage>,
    meta: HubMeta,
    images: Vec<IndexEntry>,
    labels: Vec<IndexEntry>,
}

impl HubDataset {
    /// Load metadata and index maps
    pub async fn open(storage: Arc<Storage>) -> Result<Self> {
        let raw = match storage.get_object(META_KEY).await {
            Ok(raw) => raw,
            Err(BenchError::ObjectNotFound { .. }) => {
                return Err(BenchError::DatasetNotFound {
                    location: storage.location().to_string(),
                })
            }
            Err(e) => return Err(e),
        };
        let meta: HubMeta = serde_json::from_slice(&raw)?;
        meta.validate()?;

        let images = load_index_map(&storage, &meta, IMAGES_TENSOR).await?;
        let labels = load_index_map(&storage, &meta, LABELS_TENSOR).await?;

        debug!(
            "Opened {} with {} samples",
            storage.location(),
            meta.num_samples
        );

        Ok(Self {
            storage,
            meta,
            images,
            labels,
        })
    }

    pub fn meta(&self) -> &HubMeta {
        &self.meta
    }

    pub fn len(&self) -> u64 {
        self.meta.num_samples
    }

    pub fn is_empty(&self) -> bool {
        self.meta.num_samples == 0
    }

    pub fn classes(&self) -> &[String] {
        &self.meta.classes
    }

    /// Read samples `[start, end)`, fetching each needed chunk once
    pub async fn read_range(&self, start: u64, end: u64) -> Result<Vec<HubSample>> {
        let len = self.len();
        if end > len || start > end {
            return Err(BenchError::IndexOutOfRange {
                index: end.max(start),
                len,
            });
        }
        if start == end {
            return Ok(Vec::new());
        }

        let range = start as usize..end as usize;
        let images = &self.images[range.clone()];
        let labels = &self.labels[range];

        let image_chunks = self.fetch_chunks(IMAGES_TENSOR, images).await?;
        let label_chunks = self.fetch_chunks(LABELS_TENSOR, labels).await?;

        let mut samples = Vec::with_capacity(images.len());
        for (offset, (image_entry, label_entry)) in images.iter().zip(labels).enumerate() {
            let index = start + offset as u64;
            let image = extract(IMAGES_TENSOR, image_entry, &image_chunks)?;
            let label_bytes = extract(LABELS_TENSOR, label_entry, &label_chunks)?;
            let label: [u8; 4] = label_bytes.as_ref().try_into().map_err(|_| BenchError::ManifestInvalid {
                reason: format!("label {} is {} bytes", index, label_bytes.len()),
            })?;
            samples.push(HubSample {
                index,
                image,
                label: u32::from_le_bytes(label),
            });
        }

        Ok(samples)
    }

    async fn fetch_chunks(&self, tensor: &str, entries: &[IndexEntry]) -> Result<HashMap<u32, Bytes>> {
        let needed: BTreeSet<u32> = entries
            .iter()
            .filter(|e| e.length > 0)
            .flat_map(|e| e.start_chunk..=e.end_chunk)
            .collect();

        let mut chunks = HashMap::with_capacity(needed.len());
        for chunk_id in needed {
            let raw = self.storage.get_object(&chunk_key(tensor, chunk_id)).await?;
            chunks.insert(chunk_id, decompress_with(&raw, self.meta.compression)?);
        }
        Ok(chunks)
    }
}

async fn load_index_map(storage: &Storage, meta: &HubMeta, tensor: &str) -> Result<Vec<IndexEntry>> {
    let raw = storage.get_object(&index_map_key(tensor)).await?;
    let entries: Vec<IndexEntry> = serde_json::from_slice(&raw)?;
    meta.validate_index_map(tensor, &entries)?;
    Ok(entries)
}

/// Reassemble one sample's bytes from its chunks
fn extract(tensor: &str, entry: &IndexEntry, chunks: &HashMap<u32, Bytes>) -> Result<Bytes> {
    if entry.length == 0 {
        return Ok(Bytes::new());
    }

    let invalid = |reason: String| BenchError::ManifestInvalid {
        reason: format!("{}: {}", tensor, reason),
    };
    let chunk = |id: u32| chunks.get(&id).ok_or_else(|| invalid(format!("chunk {} not loaded", id)));

    let start = entry.start_byte as usize;
    let length = entry.length as usize;

    if entry.start_chunk == entry.end_chunk {
        let data = chunk(entry.start_chunk)?;
        if start + length > data.len() {
            return Err(invalid(format!("chunk {} shorter than entry", entry.start_chunk)));
        }
        return Ok(data.slice(start..start + length));
    }

    let mut out = BytesMut::with_capacity(length);
    for id in entry.start_chunk..=entry.end_chunk {
        let data = chunk(id)?;
        let from = if id == entry.start_chunk { start } else { 0 };
        if from > data.len() {
            return Err(invalid(format!("chunk {} shorter than entry offset {}", id, from)));
        }
        let take = (length - out.len()).min(data.len().saturating_sub(from));
        out.extend_from_slice(&data[from..from + take]);
    }
    if out.len() != length {
        return Err(invalid(format!("entry spans {} of {} bytes", out.len(), length)));
    }
    Ok(out.freeze())
}
