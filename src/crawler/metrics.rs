//! Fetch latency and throughput collection for the autoscaler

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Latencies kept between samples; older ones are discarded
pub const LATENCY_WINDOW: usize = 1000;

/// What the workers did since the previous sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSample {
    /// Requests completed, including failed ones
    pub completed: u64,
    /// Mean latency over the retained window, `None` if nothing completed
    pub avg_latency: Option<Duration>,
}

impl MetricsSample {
    /// Requests per second over `elapsed`
    pub fn throughput(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.completed as f64 / secs
    }
}

/// Shared by all fetch workers
#[derive(Debug, Default)]
pub struct FetchMetrics {
    completed: AtomicU64,
    latencies: Mutex<VecDeque<Duration>>,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed request
    pub fn record(&self, latency: Duration) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        let mut latencies = self
            .latencies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if latencies.len() == LATENCY_WINDOW {
            latencies.pop_front();
        }
        latencies.push_back(latency);
    }

    /// Drains the counter and the latency window
    pub fn sample(&self) -> MetricsSample {
        let completed = self.completed.swap(0, Ordering::Relaxed);
        let drained: Vec<Duration> = self
            .latencies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();

        let avg_latency = if drained.is_empty() {
            None
        } else {
            Some(drained.iter().sum::<Duration>() / drained.len() as u32)
        };

        MetricsSample {
            completed,
            avg_latency,
        }
    }
}
