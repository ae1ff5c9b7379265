//! JobScheduler: decides what needs (re)embedding and moves jobs through the
//! queue for one backend identity.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use sift_core::errors::SiftResult;
use sift_core::models::{ClaimedJob, JobCounts, JobState, ModelIdentity};
use sift_core::traits::{ICorpusStore, IEmbeddingBackend};
use sift_core::{normalize_text, ContentHash};
use sift_observability::tracing_setup::events;
use sift_storage::queries::maintenance::PruneReport;
use sift_storage::{CompletedItem, EmbeddingStore};

pub struct JobScheduler {
    store: Arc<EmbeddingStore>,
    corpus: Arc<dyn ICorpusStore>,
    backend: Arc<dyn IEmbeddingBackend>,
}

impl JobScheduler {
    pub fn new(
        store: Arc<EmbeddingStore>,
        corpus: Arc<dyn ICorpusStore>,
        backend: Arc<dyn IEmbeddingBackend>,
    ) -> Self {
        Self {
            store,
            corpus,
            backend,
        }
    }

    pub fn identity(&self) -> &ModelIdentity {
        self.backend.identity()
    }

    pub fn backend(&self) -> &Arc<dyn IEmbeddingBackend> {
        &self.backend
    }

    pub fn store(&self) -> &Arc<EmbeddingStore> {
        &self.store
    }

    /// Queue every document whose record is missing or stale. With
    /// `rebuild_all`, queue every document. Returns the number of jobs
    /// created or refreshed.
    ///
    /// Jobs and records of documents that left the corpus are pruned first.
    pub fn enqueue(&self, rebuild_all: bool) -> SiftResult<usize> {
        let docs = self.corpus.list_documents()?;
        let live: Vec<i64> = docs.iter().map(|d| d.id).collect();
        self.prune(&live)?;

        let identity = self.identity();
        let mut skipped = 0usize;
        let items: Vec<(i64, ContentHash)> = docs
            .iter()
            .filter_map(|doc| {
                let normalized = normalize_text(&doc.text);
                if normalized.is_empty() {
                    skipped += 1;
                    return None;
                }
                Some((doc.id, ContentHash::compute(&normalized, identity)))
            })
            .collect();

        let queued = self.store.enqueue(identity, &items, rebuild_all)?;
        info!(
            backend = %identity.backend,
            model = %identity.model,
            documents = docs.len(),
            empty = skipped,
            queued,
            rebuild_all,
            "enqueue complete"
        );
        Ok(queued)
    }

    /// Drop jobs and records whose document is not in `live_ids`.
    pub fn prune(&self, live_ids: &[i64]) -> SiftResult<PruneReport> {
        let report = self.store.prune_missing(live_ids)?;
        if report.jobs > 0 || report.records > 0 {
            info!(jobs = report.jobs, records = report.records, "pruned removed documents");
        }
        Ok(report)
    }

    /// Claim up to `limit` pending jobs and join them with their current text.
    ///
    /// A job whose document vanished, or whose text normalizes to nothing,
    /// is deleted instead of being handed out.
    pub fn pick_batch(&self, limit: usize) -> SiftResult<Vec<ClaimedJob>> {
        let identity = self.identity();
        let jobs = self.store.claim_pending(identity, limit)?;
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = jobs.iter().map(|j| j.document_id).collect();
        let texts = self.corpus.texts_for(&ids)?;

        let mut claimed = Vec::with_capacity(jobs.len());
        for job in jobs {
            let text = texts
                .get(&job.document_id)
                .map(|raw| normalize_text(raw))
                .filter(|t| !t.is_empty());
            let Some(text) = text else {
                debug!(document_id = job.document_id, "document vanished before pick, dropping job");
                self.store.delete_job(identity, job.document_id)?;
                continue;
            };
            let content_hash = ContentHash::compute(&text, identity);
            let payload = self.backend.payload_for(&text);
            claimed.push(ClaimedJob {
                state: JobState {
                    document_id: job.document_id,
                    backend: identity.backend,
                    model: identity.model.clone(),
                    job_hash: job.hash,
                    attempts: job.attempts,
                    enqueued_at: job.enqueued_at,
                    started_at: job.started_at.unwrap_or_else(Utc::now),
                },
                payload,
                text,
                content_hash,
            });
        }
        Ok(claimed)
    }

    /// Persist vectors for a batch. `vectors` must be in batch order.
    pub fn complete(&self, jobs: &[ClaimedJob], vectors: Vec<Vec<f32>>) -> SiftResult<usize> {
        let items: Vec<CompletedItem> = jobs
            .iter()
            .zip(vectors)
            .map(|(job, vector)| CompletedItem {
                document_id: job.document_id(),
                claimed_hash: job.state.job_hash.clone(),
                content_hash: job.content_hash.clone(),
                vector,
            })
            .collect();
        self.store.mark_done(self.identity(), &items)
    }

    /// Requeue a failed batch with `attempts + 1`.
    pub fn fail(&self, jobs: &[ClaimedJob], error: &str) -> SiftResult<usize> {
        let ids: Vec<i64> = jobs.iter().map(ClaimedJob::document_id).collect();
        self.store.mark_failed(self.identity(), &ids, error)
    }

    /// Return this identity's `in_progress` jobs to pending.
    pub fn recover(&self) -> SiftResult<usize> {
        let count = self.store.recover_in_progress(Some(self.identity()))?;
        if count > 0 {
            events::jobs_recovered(&self.identity().progress_key(), count);
        }
        Ok(count)
    }

    pub fn counts(&self) -> SiftResult<JobCounts> {
        self.store.job_counts(self.identity())
    }
}
