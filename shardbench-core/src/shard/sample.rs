//! Sample record and tar size accounting

use bytes::Bytes;

/// Tar block size
pub const BLOCK_SIZE: u64 = 512;

/// End-of-archive marker written when a shard is closed (two zero blocks)
pub const TRAILER_SIZE: u64 = 2 * BLOCK_SIZE;

/// Extension of the label entry
pub const LABEL_EXTENSION: &str = "cls";

/// One classified image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Unique sample key
    pub key: String,
    /// Image file extension, stored as the entry suffix
    pub extension: String,
    /// Raw encoded image bytes
    pub image: Bytes,
    /// Class label
    pub label: u32,
}

impl Sample {
    pub fn new(key: impl Into<String>, extension: impl Into<String>, image: Bytes, label: u32) -> Self {
        Self {
            key: key.into(),
            extension: extension.into(),
            image,
            label,
        }
    }

    /// Tar entry name of the image
    pub fn image_entry_name(&self) -> String {
        format!("{}.{}", self.key, self.extension)
    }

    /// Tar entry name of the label
    pub fn label_entry_name(&self) -> String {
        format!("{}.{}", self.key, LABEL_EXTENSION)
    }

    /// Label encoded as ASCII decimal
    pub fn label_bytes(&self) -> Vec<u8> {
        self.label.to_string().into_bytes()
    }

    /// Exact bytes this sample occupies in a tar archive
    pub fn tar_size(&self) -> u64 {
        entry_size(self.image.len() as u64) + entry_size(self.label_bytes().len() as u64)
    }
}

/// Header block plus data padded to the block size
pub fn entry_size(data_len: u64) -> u64 {
    BLOCK_SIZE + data_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_size() {
        assert_eq!(entry_size(0), 512);
        assert_eq!(entry_size(1), 1024);
        assert_eq!(entry_size(512), 1024);
        assert_eq!(entry_size(513), 1536);
    }

    #[test]
    fn test_sample_tar_size() {
        let sample = Sample::new("0000042", "jpg", Bytes::from(vec![0u8; 600]), 7);
        // image: header + 2 blocks, label: header + 1 block
        assert_eq!(sample.tar_size(), 1536 + 1024);
        assert_eq!(sample.image_entry_name(), "0000042.jpg");
        assert_eq!(sample.label_entry_name(), "0000042.cls");
    }
}
