//! One worker loop: pick a batch, embed it, persist or requeue, repeat.
//!
//! Loops run on blocking threads. Cancellation is checked between batches
//! and during the post-failure cooldown, never inside an adapter call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use sift_core::config::PipelineConfig;
use sift_core::errors::{EmbeddingError, SiftResult};
use sift_core::models::ClaimedJob;
use sift_core::traits::IEmbeddingBackend;
use sift_observability::embedding_span;
use sift_observability::tracing_setup::events;

use crate::progress::RunProgress;
use crate::scheduler::JobScheduler;

/// Cooldown is slept in steps of this size so a stop is noticed promptly.
const COOLDOWN_STEP: Duration = Duration::from_millis(50);

/// Shared stop flag for every worker in a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub batch_size: usize,
    pub failure_cooldown: Duration,
    /// Consecutive failed batches before the worker gives up.
    pub breaker_threshold: Option<u32>,
}

impl WorkerOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            failure_cooldown: Duration::from_millis(config.failure_cooldown_ms),
            breaker_threshold: config.breaker_threshold.filter(|n| *n > 0),
        }
    }
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Why a worker loop ended.
#[derive(Debug, Clone)]
pub enum WorkerExit {
    /// A pull returned zero jobs.
    Drained,
    /// The stop flag was observed.
    Cancelled,
    /// Too many consecutive failed batches.
    BreakerOpen { failures: u32 },
    /// The adapter raised a configuration error. The run is stopped.
    Fatal(EmbeddingError),
}

/// Everything a worker loop needs. One per run, shared by all workers.
pub struct WorkerContext {
    pub scheduler: Arc<JobScheduler>,
    pub progress: Arc<RunProgress>,
    pub cancel: CancelToken,
    pub options: WorkerOptions,
    /// First configuration error raised by any worker of the run.
    fatal: Mutex<Option<EmbeddingError>>,
}

impl WorkerContext {
    pub fn new(
        scheduler: Arc<JobScheduler>,
        progress: Arc<RunProgress>,
        cancel: CancelToken,
        options: WorkerOptions,
    ) -> Self {
        Self {
            scheduler,
            progress,
            cancel,
            options,
            fatal: Mutex::new(None),
        }
    }

    /// Keep the first fatal error and stop every worker.
    fn report_fatal(&self, error: &EmbeddingError) {
        if let Ok(mut slot) = self.fatal.lock() {
            if slot.is_none() {
                *slot = Some(error.clone());
            }
        }
        self.cancel.cancel();
    }

    pub fn fatal_error(&self) -> Option<EmbeddingError> {
        self.fatal.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Run one worker loop to completion.
///
/// Store errors propagate; adapter errors requeue the batch and never end
/// the loop, except configuration errors and an open breaker.
pub fn run_worker(worker: usize, ctx: &WorkerContext) -> SiftResult<WorkerExit> {
    let scheduler = &ctx.scheduler;
    let backend = scheduler.backend();
    let mut consecutive_failures = 0u32;

    loop {
        if ctx.cancel.is_cancelled() {
            debug!(worker, "stop observed");
            return Ok(WorkerExit::Cancelled);
        }

        let batch = scheduler.pick_batch(ctx.options.batch_size)?;
        if batch.is_empty() {
            debug!(worker, "queue drained");
            return Ok(WorkerExit::Drained);
        }

        let span = embedding_span!(backend.name(), batch.len());
        let _guard = span.enter();

        let started = Instant::now();
        match embed_checked(backend.as_ref(), &batch) {
            Ok(vectors) => {
                let written = scheduler.complete(&batch, vectors)?;
                let latency = started.elapsed();
                ctx.progress.record_batch(written, latency);
                ctx.progress.publish(scheduler.store())?;
                events::batch_embedded(backend.name(), batch.len(), written, latency.as_millis() as u64);
                consecutive_failures = 0;
            }
            Err(error) => {
                let kind = error.kind();
                scheduler.fail(&batch, &error.to_string())?;
                ctx.progress.record_failure(kind.as_str());
                events::batch_failed(backend.name(), batch.len(), kind.as_str(), &error.to_string());

                if error.is_configuration() {
                    ctx.report_fatal(&error);
                    return Ok(WorkerExit::Fatal(error));
                }

                consecutive_failures += 1;
                if let Some(threshold) = ctx.options.breaker_threshold {
                    if consecutive_failures >= threshold {
                        warn!(worker, failures = consecutive_failures, "breaker open, worker stopping");
                        return Ok(WorkerExit::BreakerOpen {
                            failures: consecutive_failures,
                        });
                    }
                }
                cool_down(ctx.options.failure_cooldown, &ctx.cancel);
            }
        }
    }
}

/// Call the adapter and enforce the batch contract: one vector per job,
/// each of the advertised dimension.
fn embed_checked(
    backend: &dyn IEmbeddingBackend,
    batch: &[ClaimedJob],
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let vectors = backend.embed_jobs(batch)?;
    if vectors.len() != batch.len() {
        return Err(EmbeddingError::BatchLengthMismatch {
            expected: batch.len(),
            actual: vectors.len(),
        });
    }
    let dims = backend.dimensions();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dims,
            actual: bad.len(),
        });
    }
    Ok(vectors)
}

fn cool_down(total: Duration, cancel: &CancelToken) {
    let deadline = Instant::now() + total;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep(COOLDOWN_STEP.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn options_from_config_ignore_zero_breaker() {
        let config = PipelineConfig {
            breaker_threshold: Some(0),
            batch_size: 0,
            ..PipelineConfig::default()
        };
        let options = WorkerOptions::from_config(&config);
        assert_eq!(options.breaker_threshold, None);
        assert_eq!(options.batch_size, 1);
    }

    #[test]
    fn cooldown_returns_early_when_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let started = Instant::now();
        cool_down(Duration::from_secs(30), &token);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
