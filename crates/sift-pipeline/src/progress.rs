//! Run progress tracking and the settings-backed snapshot pollers read.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::warn;

use sift_core::errors::SiftResult;
use sift_core::models::{ModelIdentity, ProgressReport, RunSnapshot, RunStatus};
use sift_observability::EmbeddingMetrics;
use sift_storage::EmbeddingStore;

/// Thread-safe progress for one run. Shared by all of its workers.
pub struct RunProgress {
    run_id: String,
    identity: ModelIdentity,
    started_at: Instant,
    processed: AtomicU64,
    failed_batches: AtomicU64,
    status: AtomicU8,
    metrics: Mutex<EmbeddingMetrics>,
}

impl RunProgress {
    pub fn new(run_id: impl Into<String>, identity: ModelIdentity) -> Self {
        Self {
            run_id: run_id.into(),
            identity,
            started_at: Instant::now(),
            processed: AtomicU64::new(0),
            failed_batches: AtomicU64::new(0),
            status: AtomicU8::new(encode_status(RunStatus::Running)),
            metrics: Mutex::new(EmbeddingMetrics::new()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    /// Record a successful batch of `items` written records.
    pub fn record_batch(&self, items: usize, latency: Duration) {
        self.processed.fetch_add(items as u64, Ordering::Relaxed);
        if let Ok(mut m) = self.metrics.lock() {
            m.record_batch(self.identity.backend.as_str(), items, latency);
        }
    }

    /// Record a failed batch.
    pub fn record_failure(&self, kind: &str) {
        self.failed_batches.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut m) = self.metrics.lock() {
            m.record_failure(kind);
        }
    }

    pub fn set_status(&self, status: RunStatus) {
        self.status.store(encode_status(status), Ordering::Relaxed);
    }

    pub fn status(&self) -> RunStatus {
        decode_status(self.status.load(Ordering::Relaxed))
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> EmbeddingMetrics {
        self.metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let processed = self.processed();
        let elapsed = self.started_at.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            processed as f64 / elapsed
        } else {
            0.0
        };
        RunSnapshot {
            run_id: self.run_id.clone(),
            backend: self.identity.backend.as_str().to_string(),
            model: self.identity.model.clone(),
            status: self.status(),
            processed,
            failed_batches: self.failed_batches(),
            elapsed_secs: elapsed,
            rate,
            updated_at: Utc::now(),
        }
    }

    /// Write the current snapshot to settings under the identity's progress key.
    pub fn publish(&self, store: &EmbeddingStore) -> SiftResult<()> {
        let json = serde_json::to_string(&self.snapshot())?;
        store.put_setting(&self.identity.progress_key(), &json)
    }
}

fn encode_status(status: RunStatus) -> u8 {
    match status {
        RunStatus::Running => 0,
        RunStatus::Drained => 1,
        RunStatus::Stopped => 2,
        RunStatus::Failed => 3,
    }
}

fn decode_status(raw: u8) -> RunStatus {
    match raw {
        0 => RunStatus::Running,
        1 => RunStatus::Drained,
        2 => RunStatus::Stopped,
        _ => RunStatus::Failed,
    }
}

/// Read the last published snapshot for an identity, if any.
pub fn last_snapshot(store: &EmbeddingStore, identity: &ModelIdentity) -> SiftResult<Option<RunSnapshot>> {
    let Some(raw) = store.get_setting(&identity.progress_key())? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(e) => {
            warn!(key = %identity.progress_key(), error = %e, "ignoring unreadable progress snapshot");
            Ok(None)
        }
    }
}

/// Queue and record counts for an identity, combined with the run rate.
///
/// `live` takes precedence over the published snapshot when a run is active
/// in this process.
pub fn report(
    store: &EmbeddingStore,
    identity: &ModelIdentity,
    live: Option<RunSnapshot>,
) -> SiftResult<ProgressReport> {
    let counts = store.job_counts(identity)?;
    let embedded = store.record_count(identity)?;
    let snapshot = match live {
        Some(s) => Some(s),
        None => last_snapshot(store, identity)?,
    };

    let rate = snapshot.as_ref().map(|s| s.rate).unwrap_or(0.0);
    let remaining = counts.pending + counts.in_progress;
    let eta_seconds = if remaining == 0 {
        Some(0)
    } else if rate > 0.0 {
        Some((remaining as f64 / rate).ceil() as u64)
    } else {
        None
    };

    Ok(ProgressReport {
        backend: identity.backend.as_str().to_string(),
        model: identity.model.clone(),
        total: counts.total.max(embedded),
        embedded,
        pending: counts.pending,
        in_progress: counts.in_progress,
        errors: counts.errored,
        rate,
        eta_seconds,
        status: snapshot.map(|s| s.status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::models::BackendKind;

    fn identity() -> ModelIdentity {
        ModelIdentity::with_dimensions(BackendKind::OpenAi, "progress-model", 4)
    }

    #[test]
    fn initial_state() {
        let progress = RunProgress::new("run-1", identity());
        let snap = progress.snapshot();
        assert_eq!(snap.processed, 0);
        assert_eq!(snap.failed_batches, 0);
        assert_eq!(snap.status, RunStatus::Running);
        assert_eq!(snap.backend, "openai");
    }

    #[test]
    fn counts_batches_and_failures() {
        let progress = RunProgress::new("run-1", identity());
        progress.record_batch(16, Duration::from_millis(20));
        progress.record_batch(4, Duration::from_millis(10));
        progress.record_failure("transient");

        assert_eq!(progress.processed(), 20);
        assert_eq!(progress.failed_batches(), 1);
        let metrics = progress.metrics();
        assert_eq!(metrics.batches_ok, 2);
        assert_eq!(metrics.failures_by_kind.get("transient"), Some(&1));
    }

    #[test]
    fn status_round_trips() {
        let progress = RunProgress::new("run-1", identity());
        for status in [RunStatus::Drained, RunStatus::Stopped, RunStatus::Failed, RunStatus::Running] {
            progress.set_status(status);
            assert_eq!(progress.status(), status);
        }
    }

    #[test]
    fn publish_then_report() {
        let store = EmbeddingStore::open_in_memory().unwrap();
        let progress = RunProgress::new("run-7", identity());
        progress.record_batch(3, Duration::from_millis(5));
        progress.publish(&store).unwrap();

        let snap = last_snapshot(&store, &identity()).unwrap().unwrap();
        assert_eq!(snap.run_id, "run-7");
        assert_eq!(snap.processed, 3);

        let report = report(&store, &identity(), None).unwrap();
        assert_eq!(report.status, Some(RunStatus::Running));
        assert_eq!(report.eta_seconds, Some(0));
    }

    #[test]
    fn unreadable_snapshot_is_ignored() {
        let store = EmbeddingStore::open_in_memory().unwrap();
        store.put_setting(&identity().progress_key(), "not json").unwrap();
        assert!(last_snapshot(&store, &identity()).unwrap().is_none());
    }
}
