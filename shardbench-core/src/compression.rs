//! Chunk compression
//!
//! LZ4 frames and Zstd for hub chunks. The algorithm is detected from
//! the frame magic on read, so chunks written with different settings
//! can be mixed.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::{BenchError, Result};

const LZ4_MAGIC: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Store chunks as-is
    None,
    /// LZ4 frame format
    #[default]
    Lz4,
    /// Zstd
    Zstd,
}

impl std::str::FromStr for CompressionAlgorithm {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lz4" => Ok(Self::Lz4),
            "zstd" => Ok(Self::Zstd),
            other => Err(BenchError::InvalidConfig {
                reason: format!("unknown compression {}", other),
            }),
        }
    }
}

/// Compression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Algorithm to use
    pub algorithm: CompressionAlgorithm,
    /// Compression level (lz4 uses 0-16, zstd 1-22)
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            algorithm: CompressionAlgorithm::Lz4,
            level: 4,
        }
    }
}

/// Compress data using configured algorithm
pub fn compress(data: &[u8], config: &CompressionConfig) -> Result<Bytes> {
    match config.algorithm {
        CompressionAlgorithm::None => Ok(Bytes::copy_from_slice(data)),
        CompressionAlgorithm::Lz4 => compress_lz4(data, config.level),
        CompressionAlgorithm::Zstd => Ok(Bytes::from(zstd::encode_all(data, config.level)?)),
    }
}

/// Decompress data (auto-detects algorithm from header)
pub fn decompress(data: &[u8]) -> Result<Bytes> {
    if data.len() < 4 {
        return Ok(Bytes::copy_from_slice(data));
    }

    let magic = [data[0], data[1], data[2], data[3]];
    match magic {
        LZ4_MAGIC => {
            let mut decoder = lz4::Decoder::new(data)?;
            let mut out = Vec::with_capacity(data.len() * 2);
            decoder.read_to_end(&mut out)?;
            Ok(Bytes::from(out))
        }
        ZSTD_MAGIC => Ok(Bytes::from(zstd::decode_all(data)?)),
        _ => Ok(Bytes::copy_from_slice(data)),
    }
}

/// Decompress data written with a known algorithm
pub fn decompress_with(data: &[u8], algorithm: CompressionAlgorithm) -> Result<Bytes> {
    match algorithm {
        CompressionAlgorithm::None => Ok(Bytes::copy_from_slice(data)),
        CompressionAlgorithm::Lz4 | CompressionAlgorithm::Zstd => decompress(data),
    }
}

fn compress_lz4(data: &[u8], level: i32) -> Result<Bytes> {
    let mut encoder = lz4::EncoderBuilder::new()
        .level(level.clamp(0, 16) as u32)
        .build(Vec::with_capacity(data.len() / 2 + 64))?;
    encoder.write_all(data)?;
    let (out, result) = encoder.finish();
    result?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Vec<u8> {
        b"chunk of image bytes ".iter().cycle().take(4096).copied().collect()
    }

    #[test]
    fn test_lz4_frame_is_detected() {
        let original = payload();
        let compressed = compress(&original, &CompressionConfig::default()).unwrap();
        assert_eq!(compressed[..4], LZ4_MAGIC);
        assert!(compressed.len() < original.len());
        assert_eq!(decompress(&compressed).unwrap().as_ref(), original.as_slice());
    }

    #[test]
    fn test_zstd_frame_is_detected() {
        let original = payload();
        let config = CompressionConfig {
            algorithm: CompressionAlgorithm::Zstd,
            level: 3,
        };
        let compressed = compress(&original, &config).unwrap();
        assert_eq!(compressed[..4], ZSTD_MAGIC);
        assert_eq!(decompress(&compressed).unwrap().as_ref(), original.as_slice());
    }

    #[test]
    fn test_no_compression_passthrough() {
        let config = CompressionConfig {
            algorithm: CompressionAlgorithm::None,
            level: 0,
        };
        let compressed = compress(b"raw", &config).unwrap();
        assert_eq!(compressed.as_ref(), b"raw");
        assert_eq!(decompress(&compressed).unwrap().as_ref(), b"raw");
    }

    #[test]
    fn test_known_algorithm_skips_detection() {
        let looks_like_lz4: [u8; 5] = [0x04, 0x22, 0x4D, 0x18, 0x00];
        let out = decompress_with(&looks_like_lz4, CompressionAlgorithm::None).unwrap();
        assert_eq!(out.as_ref(), &looks_like_lz4[..]);
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("ZSTD".parse::<CompressionAlgorithm>().unwrap(), CompressionAlgorithm::Zstd);
        assert!("brotli".parse::<CompressionAlgorithm>().is_err());
    }
}
