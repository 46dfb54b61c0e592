//! Chunked store writer
//!
//! Packs sample bytes into fixed-capacity chunks per tensor. Completed
//! chunks are compressed and written as soon as they fill; the open chunk
//! stays in memory until it fills or the writer finishes.

use bytes::Bytes;
use tracing::{debug, info};

use super::chunks::generate_chunks;
use super::meta::{
    chunk_key, index_map_key, HubMeta, IndexEntry, TensorMeta, IMAGES_TENSOR, LABELS_TENSOR, META_KEY,
};
use crate::compression::{compress, CompressionConfig};
use crate::error::{BenchError, Result};
use crate::source::ImageFolder;
use crate::storage::Storage;

/// Configuration for the chunked store writer
#[derive(Debug, Clone)]
pub struct HubWriterConfig {
    /// Uncompressed chunk capacity in bytes
    pub chunk_size: usize,
    /// Chunk compression
    pub compression: CompressionConfig,
    /// Replace an existing dataset at the destination
    pub overwrite: bool,
}

impl Default for HubWriterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16_000_000,
            compression: CompressionConfig::default(),
            overwrite: false,
        }
    }
}

/// Chunk layout state for one tensor
struct TensorWriter {
    name: &'static str,
    dtype: &'static str,
    chunk_size: usize,
    /// Bytes of the chunk currently being filled
    open: Vec<u8>,
    /// Id of the chunk currently being filled
    next_chunk: u32,
    index_map: Vec<IndexEntry>,
}

impl TensorWriter {
    fn new(name: &'static str, dtype: &'static str, chunk_size: usize) -> Self {
        Self {
            name,
            dtype,
            chunk_size,
            open: Vec::new(),
            next_chunk: 0,
            index_map: Vec::new(),
        }
    }

    /// Append one sample, returning chunks that became full
    fn append(&mut self, data: &[u8]) -> Vec<(u32, Vec<u8>)> {
        let start_chunk = self.next_chunk;
        let start_byte = self.open.len() as u64;
        let last = (!self.open.is_empty()).then_some(self.open.len());

        let mut full = Vec::new();
        for piece in generate_chunks(data, self.chunk_size, last) {
            self.open.extend_from_slice(piece);
            if self.open.len() >= self.chunk_size {
                full.push((self.next_chunk, std::mem::take(&mut self.open)));
                self.next_chunk += 1;
            }
        }

        let end_chunk = if data.is_empty() {
            start_chunk
        } else if self.open.is_empty() {
            self.next_chunk - 1
        } else {
            self.next_chunk
        };

        self.index_map.push(IndexEntry {
            start_chunk,
            end_chunk,
            start_byte,
            length: data.len() as u64,
        });
        full
    }

    /// Take the trailing incomplete chunk, if any
    fn finish(&mut self) -> Option<(u32, Vec<u8>)> {
        if self.open.is_empty() {
            return None;
        }
        let chunk = (self.next_chunk, std::mem::take(&mut self.open));
        self.next_chunk += 1;
        Some(chunk)
    }

    fn meta(&self) -> TensorMeta {
        TensorMeta {
            name: self.name.into(),
            dtype: self.dtype.into(),
            num_chunks: self.next_chunk,
        }
    }
}

/// Writer for the chunked `images`/`labels` dataset layout
pub struct HubWriter<'a> {
    storage: &'a Storage,
    config: HubWriterConfig,
    classes: Vec<String>,
    images: TensorWriter,
    labels: TensorWriter,
    num_samples: u64,
    bytes_written: u64,
}

impl<'a> HubWriter<'a> {
    /// Start a dataset at `storage`
    pub async fn create(storage: &'a Storage, classes: Vec<String>, config: HubWriterConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(BenchError::ManifestInvalid {
                reason: "chunk_size is zero".into(),
            });
        }
        if !config.overwrite && storage.object_exists(META_KEY).await? {
            return Err(BenchError::DatasetExists {
                location: storage.location().to_string(),
            });
        }

        Ok(Self {
            storage,
            images: TensorWriter::new(IMAGES_TENSOR, "bytes", config.chunk_size),
            labels: TensorWriter::new(LABELS_TENSOR, "uint32", config.chunk_size),
            config,
            classes,
            num_samples: 0,
            bytes_written: 0,
        })
    }

    /// Append one sample
    pub async fn append(&mut self, image: &[u8], label: u32) -> Result<()> {
        let full = self.images.append(image);
        self.write_chunks(IMAGES_TENSOR, full).await?;

        let full = self.labels.append(&label.to_le_bytes());
        self.write_chunks(LABELS_TENSOR, full).await?;

        self.num_samples += 1;
        Ok(())
    }

    /// Flush open chunks, then write index maps and `meta.json`
    pub async fn finish(mut self) -> Result<HubMeta> {
        let tail: Vec<_> = self.images.finish().into_iter().collect();
        self.write_chunks(IMAGES_TENSOR, tail).await?;
        let tail: Vec<_> = self.labels.finish().into_iter().collect();
        self.write_chunks(LABELS_TENSOR, tail).await?;

        for tensor in [&self.images, &self.labels] {
            let data = serde_json::to_vec(&tensor.index_map)?;
            self.storage
                .put_object(&index_map_key(tensor.name), Bytes::from(data))
                .await?;
        }

        let meta = HubMeta {
            version: HubMeta::CURRENT_VERSION,
            created_at: chrono::Utc::now(),
            num_samples: self.num_samples,
            classes: self.classes,
            chunk_size: self.config.chunk_size as u64,
            compression: self.config.compression.algorithm,
            tensors: vec![self.images.meta(), self.labels.meta()],
        };
        self.storage
            .put_object(META_KEY, Bytes::from(serde_json::to_vec_pretty(&meta)?))
            .await?;

        info!(
            "Wrote {} samples to {} ({} compressed chunk bytes)",
            meta.num_samples,
            self.storage.location(),
            self.bytes_written
        );
        Ok(meta)
    }

    async fn write_chunks(&mut self, tensor: &str, chunks: Vec<(u32, Vec<u8>)>) -> Result<()> {
        for (chunk_id, raw) in chunks {
            let data = compress(&raw, &self.config.compression)?;
            debug!("Writing {} ({} -> {} bytes)", chunk_key(tensor, chunk_id), raw.len(), data.len());
            self.bytes_written += data.len() as u64;
            self.storage.put_object(&chunk_key(tensor, chunk_id), data).await?;
        }
        Ok(())
    }
}

/// Ingest a classification dataset into the chunked layout, in label order
pub async fn ingest_image_folder(folder: &ImageFolder, storage: &Storage, config: HubWriterConfig) -> Result<HubMeta> {
    let mut writer = HubWriter::create(storage, folder.classes().to_vec(), config).await?;
    for entry in folder.entries() {
        let image = tokio::fs::read(&entry.path).await?;
        writer.append(&image, entry.label).await?;
    }
    writer.finish().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_writer_layout() {
        let mut tensor = TensorWriter::new(IMAGES_TENSOR, "bytes", 4);

        // "abc" fits in chunk 0
        assert!(tensor.append(b"abc").is_empty());
        // "defgh" tops up chunk 0, fills chunk 1
        let full = tensor.append(b"defgh");
        assert_eq!(full, vec![(0, b"abcd".to_vec()), (1, b"efgh".to_vec())]);
        // Empty sample points at the open chunk
        assert!(tensor.append(b"").is_empty());
        assert!(tensor.append(b"i").is_empty());
        assert_eq!(tensor.finish(), Some((2, b"i".to_vec())));

        assert_eq!(
            tensor.index_map,
            vec![
                IndexEntry { start_chunk: 0, end_chunk: 0, start_byte: 0, length: 3 },
                IndexEntry { start_chunk: 0, end_chunk: 1, start_byte: 3, length: 5 },
                IndexEntry { start_chunk: 2, end_chunk: 2, start_byte: 0, length: 0 },
                IndexEntry { start_chunk: 2, end_chunk: 2, start_byte: 0, length: 1 },
            ]
        );
        assert_eq!(tensor.meta().num_chunks, 3);
    }

    #[tokio::test]
    async fn test_refuses_existing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::Local(crate::storage::LocalStore::new(dir.path()));

        let writer = HubWriter::create(&storage, vec![], HubWriterConfig::default()).await.unwrap();
        writer.finish().await.unwrap();

        let again = HubWriter::create(&storage, vec![], HubWriterConfig::default()).await;
        assert!(matches!(again, Err(BenchError::DatasetExists { .. })));

        let config = HubWriterConfig {
            overwrite: true,
            ..Default::default()
        };
        assert!(HubWriter::create(&storage, vec![], config).await.is_ok());
    }
}
