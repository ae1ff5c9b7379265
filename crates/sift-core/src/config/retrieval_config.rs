use serde::{Deserialize, Serialize};

use super::defaults;

/// Retrieval subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// RRF k-value for rank fusion.
    pub rrf_k: u32,
    /// Steepness of the hybrid modulation exponent.
    pub hybrid_alpha: f64,
    /// Candidates pulled from each signal before fusion.
    pub candidate_pool: usize,
    /// Endpoint of the external reranker. Reranking is off when unset.
    pub rerank_endpoint: Option<String>,
    /// Number of candidates to re-rank.
    pub rerank_top_k: usize,
    pub rerank_timeout_ms: u64,
    /// Keywords extracted from a query for lexical expressions.
    pub keyword_top_k: usize,
    /// Token distance for NEAR groups.
    pub near_distance: u32,
    pub ann_m: usize,
    pub ann_ef_construction: usize,
    pub ann_ef_search: usize,
    /// Cached query embeddings.
    pub query_cache_size: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: defaults::DEFAULT_RRF_K,
            hybrid_alpha: defaults::DEFAULT_HYBRID_ALPHA,
            candidate_pool: defaults::DEFAULT_CANDIDATE_POOL,
            rerank_endpoint: None,
            rerank_top_k: defaults::DEFAULT_RERANK_TOP_K,
            rerank_timeout_ms: defaults::DEFAULT_RERANK_TIMEOUT_MS,
            keyword_top_k: defaults::DEFAULT_KEYWORD_TOP_K,
            near_distance: defaults::DEFAULT_NEAR_DISTANCE,
            ann_m: defaults::DEFAULT_ANN_M,
            ann_ef_construction: defaults::DEFAULT_ANN_EF_CONSTRUCTION,
            ann_ef_search: defaults::DEFAULT_ANN_EF_SEARCH,
            query_cache_size: defaults::DEFAULT_QUERY_CACHE_SIZE,
        }
    }
}
