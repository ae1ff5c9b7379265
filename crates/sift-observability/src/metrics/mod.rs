//! Metrics registry.

pub mod embedding_metrics;
pub mod retrieval_metrics;

pub use embedding_metrics::EmbeddingMetrics;
pub use retrieval_metrics::RetrievalMetrics;

/// Owns the domain-specific collectors.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsCollector {
    pub embedding: EmbeddingMetrics,
    pub retrieval: RetrievalMetrics,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Keep at most `cap` samples, dropping the oldest.
pub(crate) fn push_sample(samples: &mut Vec<u64>, value: u64, cap: usize) {
    samples.push(value);
    if samples.len() > cap {
        samples.drain(..samples.len() - cap);
    }
}

/// Nearest-rank percentile (p in 0.0–1.0) over unsorted samples.
pub(crate) fn percentile(samples: &[u64], p: f64) -> u64 {
    if samples.is_empty() {
        return 0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let idx = ((p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64).round() as usize)
        .min(sorted.len() - 1);
    sorted[idx]
}
