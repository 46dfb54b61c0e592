//! Shardbench Core - dataset preparation and loader benchmarks
//!
//! This crate provides:
//! - Tar sharding of image-classification datasets
//! - A chunked tensor store, copied between or referenced in place on
//!   local directories and S3-compatible buckets
//! - A multi-worker data loader over either format
//! - A timing harness that drains the loader once per worker count

pub mod bench;
pub mod compression;
pub mod error;
pub mod hub;
pub mod loader;
pub mod metrics;
pub mod runtime;
pub mod shard;
pub mod source;
pub mod storage;

pub use error::{BenchError, Result};
pub use runtime::BenchRuntime;

/// Default maximum shard size in bytes
pub const DEFAULT_MAX_SHARD_SIZE: u64 = 3_000_000_000;

/// Default maximum samples per shard
pub const DEFAULT_MAX_SHARD_COUNT: u64 = 100_000;

/// Default worker counts swept by the benchmark
pub const DEFAULT_WORKER_COUNTS: &[usize] = &[0, 1, 2, 4, 8];
