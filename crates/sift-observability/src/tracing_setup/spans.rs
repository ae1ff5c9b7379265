//! Span definitions per operation: embedding batches, worker loops, retrieval, index builds.

/// Create an embedding span for one batch.
#[macro_export]
macro_rules! embedding_span {
    ($backend:expr, $batch_size:expr) => {
        tracing::info_span!("sift.embedding", backend = %$backend, batch_size = $batch_size)
    };
}

/// Create a worker span.
#[macro_export]
macro_rules! worker_span {
    ($run_id:expr, $worker:expr) => {
        tracing::info_span!("sift.worker", run_id = %$run_id, worker = $worker)
    };
}

/// Create a retrieval span.
#[macro_export]
macro_rules! retrieval_span {
    ($query:expr, $mode:expr) => {
        tracing::info_span!("sift.retrieval", query = %$query, mode = ?$mode)
    };
}

/// Create an index build span.
#[macro_export]
macro_rules! index_span {
    ($backend:expr, $model:expr) => {
        tracing::info_span!("sift.index", backend = %$backend, model = %$model)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const EMBEDDING: &str = "sift.embedding";
    pub const WORKER: &str = "sift.worker";
    pub const RETRIEVAL: &str = "sift.retrieval";
    pub const INDEX: &str = "sift.index";
}
