//! Batch latency, throughput, failures by kind, and backend usage for embedding runs.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{percentile, push_sample};

const MAX_SAMPLES: usize = 10_000;

/// Embedding subsystem metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingMetrics {
    pub batches_ok: u64,
    pub batches_failed: u64,
    pub items_embedded: u64,
    /// Failed batches keyed by error kind (transient, contract, configuration).
    pub failures_by_kind: HashMap<String, u64>,
    /// Items embedded per backend.
    pub backend_usage: HashMap<String, u64>,
    /// Batch latency samples in microseconds.
    latency_samples_us: Vec<u64>,
}

impl EmbeddingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful batch.
    pub fn record_batch(&mut self, backend: &str, items: usize, latency: Duration) {
        self.batches_ok += 1;
        self.items_embedded += items as u64;
        *self.backend_usage.entry(backend.to_string()).or_default() += items as u64;
        push_sample(
            &mut self.latency_samples_us,
            latency.as_micros() as u64,
            MAX_SAMPLES,
        );
    }

    /// Record a failed batch.
    pub fn record_failure(&mut self, kind: &str) {
        self.batches_failed += 1;
        *self.failures_by_kind.entry(kind.to_string()).or_default() += 1;
    }

    /// Batch latency at the given percentile (0.0–1.0).
    pub fn latency_percentile(&self, p: f64) -> Duration {
        Duration::from_micros(percentile(&self.latency_samples_us, p))
    }

    /// Fraction of batches that failed.
    pub fn failure_rate(&self) -> f64 {
        let total = self.batches_ok + self.batches_failed;
        if total == 0 {
            0.0
        } else {
            self.batches_failed as f64 / total as f64
        }
    }
}
