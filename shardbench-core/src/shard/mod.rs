//! Tar shards
//!
//! Fixed-size tar archives holding `<key>.<ext>` image entries paired
//! with `<key>.cls` label entries.

pub mod index;
pub mod reader;
pub mod sample;
pub mod writer;

pub use index::{ShardIndex, ShardMetadata};
pub use reader::read_samples;
pub use sample::Sample;
pub use writer::{write_shards, ShardWriter, ShardWriterConfig};

/// Shard file name for a shard number
pub fn shard_file_name(name: &str, split: &str, shard_id: u32) -> String {
    format!("{}-{}-{:06}.tar", name, split, shard_id)
}
