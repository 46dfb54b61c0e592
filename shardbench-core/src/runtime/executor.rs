//! Tokio runtime executor configuration
//!
//! Storage requests run on the I/O runtime. Loader workers, which decode
//! tar data, run on the compute runtime so slow fetches never starve
//! decoding. The harness drives everything from the calling thread with
//! `block_on`.

use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::error::{BenchError, Result};

/// How long shutdown waits for in-flight storage writes
const IO_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Thread counts for the two runtimes
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Threads serving storage requests
    pub io_threads: usize,
    /// Threads running loader workers
    pub compute_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            io_threads: cpus.max(4),
            compute_threads: cpus.max(2),
        }
    }
}

fn build_runtime(label: &str, threads: usize) -> Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(threads.max(1))
        .thread_name(format!("shardbench-{}", label))
        .enable_all()
        .build()
        .map_err(|e| BenchError::Internal {
            message: format!("Failed to create {} runtime: {}", label, e),
        })
}

/// Runtime pair shared by every loader of a benchmark run
pub struct BenchRuntime {
    io: Runtime,
    compute: Runtime,
}

impl BenchRuntime {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        Ok(Self {
            io: build_runtime("io", config.io_threads)?,
            compute: build_runtime("compute", config.compute_threads)?,
        })
    }

    /// Spawn a loader worker
    pub fn spawn_compute<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.compute.spawn(future)
    }

    /// Handle workers use to issue storage requests
    pub fn io_handle(&self) -> Handle {
        self.io.handle().clone()
    }

    /// Drive a future to completion from outside both runtimes
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.io.block_on(future)
    }

    /// Abandon running workers, then let storage writes finish
    pub fn shutdown(self) {
        self.compute.shutdown_background();
        self.io.shutdown_timeout(IO_SHUTDOWN_TIMEOUT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on() {
        let runtime = BenchRuntime::new(RuntimeConfig::default()).unwrap();
        assert_eq!(runtime.block_on(async { 42 }), 42);
    }

    #[test]
    fn test_compute_task_reaches_io_runtime() {
        let runtime = BenchRuntime::new(RuntimeConfig {
            io_threads: 1,
            compute_threads: 0,
        })
        .unwrap();
        let io = runtime.io_handle();

        let handle = runtime.spawn_compute(async move {
            let name = io.spawn(async { std::thread::current().name().map(str::to_string) });
            name.await.unwrap()
        });
        let name = runtime.block_on(handle).unwrap();
        assert_eq!(name.as_deref(), Some("shardbench-io"));
        runtime.shutdown();
    }
}
