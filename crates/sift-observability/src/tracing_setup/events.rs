//! Structured log events for key system operations.
//!
//! Each function emits a `tracing` event with structured fields.

/// Log the start of an embedding run.
pub fn run_started(run_id: &str, backend: &str, model: &str, workers: usize, enqueued: usize) {
    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        backend = %backend,
        model = %model,
        workers = workers,
        enqueued = enqueued,
        "embedding run started"
    );
}

/// Log the end of an embedding run.
pub fn run_finished(run_id: &str, status: &str, processed: u64, failed_batches: u64) {
    tracing::info!(
        event = "run_finished",
        run_id = %run_id,
        status = %status,
        processed = processed,
        failed_batches = failed_batches,
        "embedding run finished"
    );
}

/// Log a completed batch.
pub fn batch_embedded(backend: &str, size: usize, written: usize, latency_ms: u64) {
    tracing::debug!(
        event = "batch_embedded",
        backend = %backend,
        size = size,
        written = written,
        latency_ms = latency_ms,
        "batch embedded"
    );
}

/// Log a failed batch. The jobs go back to pending.
pub fn batch_failed(backend: &str, size: usize, kind: &str, error: &str) {
    tracing::warn!(
        event = "batch_failed",
        backend = %backend,
        size = size,
        kind = %kind,
        error = %error,
        "batch failed, jobs requeued"
    );
}

/// Log in-flight jobs reset to pending after an interruption.
pub fn jobs_recovered(scope: &str, count: usize) {
    tracing::info!(
        event = "jobs_recovered",
        scope = %scope,
        count = count,
        "in-progress jobs returned to pending"
    );
}

/// Log a worker that panicked and is being restarted.
pub fn worker_restarted(worker: usize, restarts: u32, reason: &str) {
    tracing::error!(
        event = "worker_restarted",
        worker = worker,
        restarts = restarts,
        reason = %reason,
        "worker panicked, restarting"
    );
}

/// Log a degradation trigger event.
pub fn degradation_triggered(component: &str, failure: &str, fallback: &str) {
    tracing::warn!(
        event = "degradation_triggered",
        component = %component,
        failure = %failure,
        fallback = %fallback,
        "degradation triggered"
    );
}

/// Log an accelerating index build.
pub fn index_rebuilt(backend: &str, model: &str, documents: usize, skipped: usize, build_ms: u64) {
    tracing::info!(
        event = "index_rebuilt",
        backend = %backend,
        model = %model,
        documents = documents,
        skipped = skipped,
        build_ms = build_ms,
        "vector index rebuilt"
    );
}

/// Log embedding run progress.
pub fn run_progress(run_id: &str, processed: u64, total: u64, rate: f64) {
    tracing::info!(
        event = "run_progress",
        run_id = %run_id,
        processed = processed,
        total = total,
        rate = rate,
        "embedding run progress"
    );
}
