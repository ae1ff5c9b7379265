//! Per-mode query counts, hit rate, fallbacks, cache effectiveness, latency.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sift_core::models::SearchMode;

use super::{percentile, push_sample};

const MAX_SAMPLES: usize = 10_000;

/// Tracks retrieval effectiveness metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    /// Per-mode total query counts.
    pub queries_by_mode: HashMap<String, u64>,
    /// Per-mode queries that returned at least one result.
    pub hits_by_mode: HashMap<String, u64>,
    /// Searches that ran on a single path because the other failed.
    pub fallbacks: u64,
    pub rerank_attempts: u64,
    pub rerank_failures: u64,
    pub cache_lookups: u64,
    pub cache_hits: u64,
    latency_samples_us: Vec<u64>,
}

impl RetrievalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed search.
    pub fn record_query(&mut self, mode: SearchMode, hit: bool, latency: Duration) {
        let key = mode_key(mode);
        *self.queries_by_mode.entry(key.to_string()).or_default() += 1;
        if hit {
            *self.hits_by_mode.entry(key.to_string()).or_default() += 1;
        }
        push_sample(
            &mut self.latency_samples_us,
            latency.as_micros() as u64,
            MAX_SAMPLES,
        );
    }

    pub fn record_fallback(&mut self) {
        self.fallbacks += 1;
    }

    pub fn record_rerank(&mut self, succeeded: bool) {
        self.rerank_attempts += 1;
        if !succeeded {
            self.rerank_failures += 1;
        }
    }

    pub fn record_cache_lookup(&mut self, hit: bool) {
        self.cache_lookups += 1;
        if hit {
            self.cache_hits += 1;
        }
    }

    /// Hit rate for one mode.
    pub fn hit_rate(&self, mode: SearchMode) -> f64 {
        let key = mode_key(mode);
        let queries = self.queries_by_mode.get(key).copied().unwrap_or(0);
        if queries == 0 {
            return 0.0;
        }
        let hits = self.hits_by_mode.get(key).copied().unwrap_or(0);
        hits as f64 / queries as f64
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.cache_lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.cache_lookups as f64
        }
    }

    pub fn latency_percentile(&self, p: f64) -> Duration {
        Duration::from_micros(percentile(&self.latency_samples_us, p))
    }
}

fn mode_key(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::Lexical => "lexical",
        SearchMode::Vector => "vector",
        SearchMode::Hybrid => "hybrid",
    }
}
