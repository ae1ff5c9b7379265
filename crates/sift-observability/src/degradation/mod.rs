//! Degradation tracking for search-path fallbacks.

pub mod tracker;

pub use tracker::{DegradationTracker, RecoveryStatus, TrackedDegradation};

/// Component names used when recording degradations.
pub mod components {
    pub const LEXICAL: &str = "lexical_search";
    pub const VECTOR: &str = "vector_search";
    pub const ANN_INDEX: &str = "ann_index";
    pub const RERANK: &str = "rerank";
}
