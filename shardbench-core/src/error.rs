//! Error types for shardbench
//!
//! One taxonomy covering the classification source, shard writing,
//! storage, the chunked hub store and the runtime.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for all shardbench operations
#[derive(Debug, Error)]
pub enum BenchError {
    // ========== Source Errors ==========

    /// Classification dataset root does not exist
    #[error("Input directory does not exist: {}", path.display())]
    InputDirMissing { path: PathBuf },

    /// Shard destination does not exist
    #[error("Output directory does not exist: {}", path.display())]
    OutputDirMissing { path: PathBuf },

    // ========== Sharding Errors ==========

    /// Same sample key written twice in one run
    #[error("Duplicate sample key: {key}")]
    DuplicateKey { key: String },

    /// Sample cannot fit even in an empty shard
    #[error("Sample {key} needs {needed} bytes, shard limit is {limit}")]
    SampleTooLarge { key: String, needed: u64, limit: u64 },

    /// Tar shard does not follow the key/extension sample layout
    #[error("Malformed shard {shard}: {reason}")]
    MalformedShard { shard: String, reason: String },

    // ========== Storage Errors ==========

    /// Storage operation failed
    #[error("Storage operation failed: {message}")]
    StorageError { message: String },

    /// Object not found in storage
    #[error("Object not found: {key}")]
    ObjectNotFound { key: String },

    /// Checksum mismatch on read
    #[error("Checksum mismatch for {key}: expected {expected}, got {actual}")]
    ChecksumMismatch { key: String, expected: u32, actual: u32 },

    /// Dataset location string could not be parsed
    #[error("Invalid dataset location {location}: {reason}")]
    InvalidLocation { location: String, reason: String },

    // ========== Hub Errors ==========

    /// No chunked dataset at the location
    #[error("Dataset not found: {location}")]
    DatasetNotFound { location: String },

    /// Destination already holds a chunked dataset
    #[error("Dataset already exists at {location}")]
    DatasetExists { location: String },

    /// Sample index past the end of the dataset
    #[error("Sample index {index} out of range for {len} samples")]
    IndexOutOfRange { index: u64, len: u64 },

    /// Metadata or index map failed validation
    #[error("Manifest validation failed: {reason}")]
    ManifestInvalid { reason: String },

    // ========== Runtime Errors ==========

    /// Loader or runtime configuration rejected
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    /// Returns true if this error means a required directory is absent
    pub fn is_missing_dir(&self) -> bool {
        matches!(
            self,
            BenchError::InputDirMissing { .. } | BenchError::OutputDirMissing { .. }
        )
    }

    /// Returns true if this error indicates data corruption
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            BenchError::ChecksumMismatch { .. }
                | BenchError::MalformedShard { .. }
                | BenchError::ManifestInvalid { .. }
        )
    }
}

/// Result type alias for shardbench operations
pub type Result<T> = std::result::Result<T, BenchError>;
