//! Shared setup: the clinical-notes corpus embedded with the stub backend,
//! and an in-process HTTP mock for the reranker.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use sift_core::config::RetrievalConfig;
use sift_core::models::ModelIdentity;
use sift_core::traits::{ICorpusStore, IEmbeddingBackend};
use sift_retrieval::RetrievalEngine;
use sift_storage::{EmbeddingStore, SqliteCorpus};
use test_fixtures::{CorpusFixture, StubBackend};

pub const DIMS: usize = 256;

pub struct Harness {
    pub fixture: CorpusFixture,
    pub store: Arc<EmbeddingStore>,
    pub corpus: Arc<SqliteCorpus>,
    pub backend: Arc<StubBackend>,
}

impl Harness {
    /// Fixture corpus with every document embedded.
    pub fn embedded() -> Self {
        let fixture = test_fixtures::load_corpus(test_fixtures::CLINICAL_NOTES);
        let corpus = Arc::new(test_fixtures::seeded_corpus(&fixture));
        let store = Arc::new(EmbeddingStore::open_in_memory().unwrap());
        let backend = Arc::new(StubBackend::new(DIMS));
        test_fixtures::embed_corpus(&store, corpus.as_ref(), backend.as_ref());
        Self {
            fixture,
            store,
            corpus,
            backend,
        }
    }

    pub fn dyn_corpus(&self) -> Arc<dyn ICorpusStore> {
        self.corpus.clone()
    }

    pub fn backend_identity(&self) -> ModelIdentity {
        self.backend.identity().clone()
    }

    /// Engine with the stub backend as query embedder.
    pub fn engine(&self, config: RetrievalConfig) -> RetrievalEngine {
        RetrievalEngine::new(Arc::clone(&self.store), self.dyn_corpus(), config)
            .unwrap()
            .with_embedder(self.backend.clone())
    }

    /// Engine with lexical search only.
    pub fn lexical_engine(&self) -> RetrievalEngine {
        RetrievalEngine::new(
            Arc::clone(&self.store),
            self.dyn_corpus(),
            RetrievalConfig::default(),
        )
        .unwrap()
    }
}

pub fn ids(hits: &[sift_core::SearchHit]) -> Vec<i64> {
    hits.iter().map(|h| h.document_id).collect()
}

/// The first `n` ids, sorted, for order-insensitive comparison.
pub fn top_set(hits: &[sift_core::SearchHit], n: usize) -> Vec<i64> {
    let mut top: Vec<i64> = hits.iter().take(n).map(|h| h.document_id).collect();
    top.sort_unstable();
    top
}

pub struct MockServer {
    pub base_url: String,
    _runtime: tokio::runtime::Runtime,
}

/// Serve `router` on an ephemeral local port. `None` when the sandbox
/// forbids binding sockets.
pub fn spawn(router: Router) -> Option<MockServer> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("mock runtime");
    let listener = match runtime.block_on(tokio::net::TcpListener::bind("127.0.0.1:0")) {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            eprintln!("skipping: cannot bind local socket: {e}");
            return None;
        }
        Err(e) => panic!("bind mock server: {e}"),
    };
    let addr = listener.local_addr().expect("mock addr");
    runtime.spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Some(MockServer {
        base_url: format!("http://{addr}"),
        _runtime: runtime,
    })
}
