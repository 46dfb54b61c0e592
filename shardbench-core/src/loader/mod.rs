//! Data loading
//!
//! Splits a sample source into work items, deals them to workers and
//! delivers batches over a bounded channel.

pub mod assign;
pub mod batch;
pub mod data_loader;
pub mod source;
mod worker;

pub use assign::assign;
pub use batch::Batch;
pub use data_loader::{DataLoader, DataLoaderConfig};
pub use source::{SampleSource, ShardSpec, WorkItem};
