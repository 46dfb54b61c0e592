//! Async runtime management
//!
//! Separate Tokio runtimes for storage I/O and loader workers.

pub mod executor;

pub use executor::{BenchRuntime, RuntimeConfig};
