#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sift_core::traits::{ICorpusStore, IEmbeddingBackend};
use sift_pipeline::{CancelToken, JobScheduler, RunProgress, WorkerContext, WorkerOptions};
use sift_storage::{EmbeddingStore, SqliteCorpus};

pub const DIMS: usize = 16;

pub struct Harness {
    pub store: Arc<EmbeddingStore>,
    pub corpus: Arc<SqliteCorpus>,
    pub scheduler: Arc<JobScheduler>,
}

impl Harness {
    pub fn new(texts: &[(i64, &str)], backend: Arc<dyn IEmbeddingBackend>) -> Self {
        let store = Arc::new(EmbeddingStore::open_in_memory().unwrap());
        let corpus = Arc::new(test_fixtures::corpus_from_texts(texts));
        Self::with_parts(store, corpus, backend)
    }

    pub fn with_parts(
        store: Arc<EmbeddingStore>,
        corpus: Arc<SqliteCorpus>,
        backend: Arc<dyn IEmbeddingBackend>,
    ) -> Self {
        let scheduler = Arc::new(JobScheduler::new(
            Arc::clone(&store),
            Arc::clone(&corpus) as Arc<dyn ICorpusStore>,
            backend,
        ));
        Self {
            store,
            corpus,
            scheduler,
        }
    }

    /// A worker context with no cooldown, so failure tests run fast.
    pub fn context(&self, batch_size: usize, breaker: Option<u32>) -> WorkerContext {
        let identity = self.scheduler.identity().clone();
        WorkerContext::new(
            Arc::clone(&self.scheduler),
            Arc::new(RunProgress::new("test-run", identity)),
            CancelToken::new(),
            WorkerOptions {
                batch_size,
                failure_cooldown: Duration::ZERO,
                breaker_threshold: breaker,
            },
        )
    }
}

pub fn texts(n: i64) -> Vec<(i64, String)> {
    (1..=n).map(|id| (id, format!("document number {id} about topic {}", id % 7))).collect()
}

pub fn borrowed(texts: &[(i64, String)]) -> Vec<(i64, &str)> {
    texts.iter().map(|(id, t)| (*id, t.as_str())).collect()
}
