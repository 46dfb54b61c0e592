//! Batches handed to the consumer

use bytes::Bytes;

/// A batch of decoded samples, column-major
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// Sample keys (shard sample key, or the index for chunked datasets)
    pub keys: Vec<String>,
    /// Encoded image bytes
    pub images: Vec<Bytes>,
    pub labels: Vec<u32>,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            images: Vec::with_capacity(capacity),
            labels: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, key: String, image: Bytes, label: u32) {
        self.keys.push(key);
        self.images.push(image);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total image bytes
    pub fn byte_size(&self) -> u64 {
        self.images.iter().map(|i| i.len() as u64).sum()
    }
}
