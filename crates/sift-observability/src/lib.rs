//! # sift-observability
//!
//! Structured tracing with span definitions, degradation event tracking for
//! the retrieval fallbacks, and metrics for embedding runs and searches.

pub mod degradation;
pub mod metrics;
pub mod tracing_setup;

pub use degradation::{DegradationTracker, RecoveryStatus, TrackedDegradation};
pub use metrics::{EmbeddingMetrics, MetricsCollector, RetrievalMetrics};
pub use tracing_setup::{init_tracing, init_tracing_with_filter};
