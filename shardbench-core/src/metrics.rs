//! Loader metrics
//!
//! Lock-free counters and a latency histogram, shared between a loader
//! and whoever reports on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counter metric (monotonically increasing)
pub struct Counter {
    value: AtomicU64,
    name: &'static str,
}

impl Counter {
    pub const fn new(name: &'static str) -> Self {
        Self {
            value: AtomicU64::new(0),
            name,
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Histogram for latency measurements, in seconds
pub struct Histogram {
    name: &'static str,
    buckets: Vec<(f64, AtomicU64)>,
    /// Sum of observations in microseconds
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Create with default latency buckets
    pub fn new(name: &'static str) -> Self {
        Self::with_buckets(
            name,
            &[0.0001, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0],
        )
    }

    pub fn with_buckets(name: &'static str, bounds: &[f64]) -> Self {
        Self {
            name,
            buckets: bounds.iter().map(|&b| (b, AtomicU64::new(0))).collect(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, seconds: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((seconds * 1_000_000.0) as u64, Ordering::Relaxed);

        for (bound, count) in &self.buckets {
            if seconds <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Record the time elapsed since `start`
    pub fn observe_since(&self, start: Instant) {
        self.observe(start.elapsed().as_secs_f64());
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum_secs(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Mean observation, 0 when empty
    pub fn mean_secs(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum_secs() / n as f64,
        }
    }

    /// Cumulative `(upper bound, count)` pairs
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .map(|(bound, count)| (*bound, count.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Metrics recorded by one data loader
pub struct LoaderMetrics {
    pub batches: Counter,
    pub samples: Counter,
    pub bytes: Counter,
    /// Time `next_batch` spent waiting on workers
    pub batch_wait: Histogram,
}

impl LoaderMetrics {
    pub fn new() -> Self {
        Self {
            batches: Counter::new("loader_batches_total"),
            samples: Counter::new("loader_samples_total"),
            bytes: Counter::new("loader_bytes_total"),
            batch_wait: Histogram::new("loader_batch_wait_seconds"),
        }
    }

    /// Text exposition of every metric
    pub fn render(&self) -> String {
        let mut out = String::new();
        for counter in [&self.batches, &self.samples, &self.bytes] {
            out.push_str(&format!("{} {}\n", counter.name(), counter.get()));
        }
        let wait = &self.batch_wait;
        for (bound, count) in wait.buckets() {
            out.push_str(&format!("{}_bucket{{le=\"{}\"}} {}\n", wait.name(), bound, count));
        }
        out.push_str(&format!("{}_sum {}\n", wait.name(), wait.sum_secs()));
        out.push_str(&format!("{}_count {}\n", wait.name(), wait.count()));
        out
    }
}

impl Default for LoaderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new("test_counter");
        assert_eq!(counter.get(), 0);

        counter.inc();
        counter.inc_by(5);
        assert_eq!(counter.get(), 6);
    }

    #[test]
    fn test_histogram() {
        let histogram = Histogram::with_buckets("test_histogram", &[0.01, 1.0]);
        histogram.observe(0.001);
        histogram.observe(0.5);
        histogram.observe(2.0);

        assert_eq!(histogram.count(), 3);
        assert_eq!(histogram.buckets(), vec![(0.01, 1), (1.0, 2)]);
        assert!((histogram.mean_secs() - 2.501 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_render() {
        let metrics = LoaderMetrics::new();
        metrics.batches.inc();
        metrics.batch_wait.observe(0.002);

        let text = metrics.render();
        assert!(text.contains("loader_batches_total 1"));
        assert!(text.contains("loader_batch_wait_seconds_count 1"));
    }
}
