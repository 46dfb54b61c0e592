//! Chunked tensor store
//!
//! A versioned-storage style dataset layout: per-tensor chunks plus index
//! maps, readable from local directories or buckets.

pub mod chunks;
pub mod copy;
pub mod meta;
pub mod reader;
pub mod writer;

pub use chunks::generate_chunks;
pub use copy::{copy_dataset, reference_dataset, CopyReport};
pub use meta::{HubMeta, IndexEntry, TensorMeta};
pub use reader::{HubDataset, HubSample};
pub use writer::{ingest_image_folder, HubWriter, HubWriterConfig};
