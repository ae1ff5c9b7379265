//! RetrievalEngine over the clinical-notes fixture: the three modes,
//! similar-to, the ANN index, fallbacks, and the query cache.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use sift_core::config::RetrievalConfig;
use sift_core::errors::{RetrievalError, SiftError, SiftResult};
use sift_core::models::{
    BackendKind, Document, DocumentText, LexicalHit, ModelIdentity, SearchMode,
};
use sift_core::traits::ICorpusStore;
use sift_core::ContentHash;
use sift_observability::RecoveryStatus;
use sift_retrieval::RetrievalEngine;
use sift_storage::{CompletedItem, EmbeddingStore};

use common::{ids, top_set, Harness};

/// Write `vectors` for `identity` through the queue, as the pipeline would.
fn store_vectors(store: &EmbeddingStore, identity: &ModelIdentity, vectors: &[(i64, Vec<f32>)]) {
    let hashes: Vec<(i64, ContentHash)> = vectors
        .iter()
        .map(|(id, _)| (*id, ContentHash::compute(&format!("doc {id}"), identity)))
        .collect();
    store.enqueue(identity, &hashes, true).unwrap();
    let claimed = store.claim_pending(identity, vectors.len()).unwrap();
    let items: Vec<CompletedItem> = claimed
        .into_iter()
        .map(|job| {
            let position = vectors
                .iter()
                .position(|(id, _)| *id == job.document_id)
                .unwrap();
            CompletedItem {
                document_id: job.document_id,
                claimed_hash: job.hash,
                content_hash: hashes[position].1.clone(),
                vector: vectors[position].1.clone(),
            }
        })
        .collect();
    assert_eq!(store.mark_done(identity, &items).unwrap(), vectors.len());
}

/// Corpus whose full-text index is broken.
struct BrokenFts(Arc<dyn ICorpusStore>);

impl ICorpusStore for BrokenFts {
    fn list_documents(&self) -> SiftResult<Vec<DocumentText>> {
        self.0.list_documents()
    }

    fn texts_for(&self, ids: &[i64]) -> SiftResult<HashMap<i64, String>> {
        self.0.texts_for(ids)
    }

    fn search_lexical(&self, _expression: &str, _limit: usize) -> SiftResult<Vec<LexicalHit>> {
        Err(RetrievalError::LexicalUnavailable {
            reason: "no such table: documents_fts".into(),
        }
        .into())
    }
}

#[test]
fn fixture_queries_rank_expected_documents_in_every_mode() {
    let h = Harness::embedded();
    let engine = h.engine(RetrievalConfig::default());
    for query in &h.fixture.queries {
        for mode in [SearchMode::Lexical, SearchMode::Vector, SearchMode::Hybrid] {
            let hits = engine.search(&query.text, mode, 5).unwrap();
            let mut expected = query.expected_top.clone();
            expected.sort_unstable();
            assert_eq!(
                top_set(&hits, expected.len()),
                expected,
                "{mode:?} search for {:?} returned {:?}",
                query.text,
                ids(&hits)
            );
        }
    }
}

#[test]
fn lexical_hits_carry_bm25_cost() {
    let h = Harness::embedded();
    let hits = h
        .lexical_engine()
        .search("blood pressure", SearchMode::Lexical, 10)
        .unwrap();
    assert!(hits.len() >= 2);
    for hit in &hits {
        let bm25 = hit.bm25.expect("lexical hit has bm25");
        assert!(bm25 < 0.0);
        assert!(hit.similarity.is_none());
    }
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn hyphenated_keyword_matches_as_a_phrase() {
    let h = Harness::embedded();
    let hits = h
        .lexical_engine()
        .search("5α-reductase", SearchMode::Lexical, 10)
        .unwrap();
    assert_eq!(ids(&hits), vec![1]);
}

#[test]
fn hybrid_hits_carry_both_signals() {
    let h = Harness::embedded();
    let hits = h
        .engine(RetrievalConfig::default())
        .search("heart failure edema", SearchMode::Hybrid, 10)
        .unwrap();
    let top = &hits[0];
    assert!(top.bm25.is_some());
    let similarity = top.similarity.expect("similarity");
    assert!(top.score > 0.0 && top.score <= 1.0);
    assert!(similarity > 0.0);
    assert!(hits.iter().all(|h| h.document_id != 11));
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn empty_and_markup_only_queries_return_nothing() {
    let h = Harness::embedded();
    let engine = h.engine(RetrievalConfig::default());
    for query in ["", "   ", "<b></b>", "<div>[sound:x.mp3]</div>"] {
        for mode in [SearchMode::Lexical, SearchMode::Vector, SearchMode::Hybrid] {
            assert!(engine.search(query, mode, 10).unwrap().is_empty());
        }
    }
    assert!(engine
        .search("the and of", SearchMode::Lexical, 10)
        .unwrap()
        .is_empty());
    assert!(engine
        .search("blood pressure", SearchMode::Hybrid, 0)
        .unwrap()
        .is_empty());
}

#[test]
fn limit_caps_results() {
    let h = Harness::embedded();
    let hits = h
        .engine(RetrievalConfig::default())
        .search("airway inflammation", SearchMode::Vector, 1)
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn similar_to_excludes_the_seed() {
    let h = Harness::embedded();
    let engine = h.engine(RetrievalConfig::default());
    let hits = engine.similar_to(9, 3).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].document_id, 10);
    assert!(hits.iter().all(|hit| hit.document_id != 9));
    assert!(hits[0].similarity.unwrap() > hits[2].similarity.unwrap());
}

#[test]
fn similar_to_unembedded_document_is_empty() {
    let h = Harness::embedded();
    let engine = h.engine(RetrievalConfig::default());
    assert!(engine.similar_to(11, 5).unwrap().is_empty());
    assert!(engine.similar_to(999, 5).unwrap().is_empty());
}

#[test]
fn similar_to_works_from_identity_alone() {
    let h = Harness::embedded();
    let engine = h
        .lexical_engine()
        .with_identity(h.backend_identity());
    assert_eq!(engine.similar_to(9, 1).unwrap()[0].document_id, 10);
}

#[test]
fn similar_to_without_identity_is_vector_unavailable() {
    let h = Harness::embedded();
    let err = h.lexical_engine().similar_to(9, 3).unwrap_err();
    assert!(matches!(
        err,
        SiftError::Retrieval(RetrievalError::VectorUnavailable { .. })
    ));
}

#[test]
fn index_rebuild_reports_status_and_serves_queries() {
    let h = Harness::embedded();
    let engine = h.engine(RetrievalConfig::default());
    let scan = engine
        .search("airway inflammation", SearchMode::Vector, 2)
        .unwrap();

    let status = engine.rebuild_accelerating_index().unwrap();
    assert_eq!(status.documents, 11);
    assert_eq!(status.dimension, common::DIMS);
    assert_eq!(status.off_dimension, 0);
    assert_eq!(status.skipped, 0);
    assert_eq!(status.backend, "openai");
    assert_eq!(status.model, "stub-model");
    assert!(engine.has_accelerating_index());

    let ann = engine
        .search("airway inflammation", SearchMode::Vector, 2)
        .unwrap();
    assert_eq!(top_set(&ann, 2), top_set(&scan, 2));
    assert!(engine.degradations().is_empty());
}

#[test]
fn mixed_dimension_store_serves_the_same_neighbours_from_the_index() {
    let identity = ModelIdentity::with_dimensions(BackendKind::OpenAi, "m", 3);
    let store = Arc::new(EmbeddingStore::open_in_memory().unwrap());
    store_vectors(
        &store,
        &identity,
        &[
            (1, vec![1.0, 0.0, 0.0]),
            (2, vec![0.6, 0.8, 0.0]),
            (3, vec![0.0, 1.0, 0.0]),
            (4, vec![0.9, 0.1]),
        ],
    );
    let corpus: Arc<dyn ICorpusStore> = Arc::new(test_fixtures::corpus_from_texts(&[
        (1, "one"),
        (2, "two"),
        (3, "three"),
        (4, "four"),
    ]));
    let engine = RetrievalEngine::new(store, corpus, RetrievalConfig::default())
        .unwrap()
        .with_identity(identity);

    let scan = engine.similar_to(1, 3).unwrap();
    assert_eq!(ids(&scan), vec![4, 2, 3]);

    let status = engine.rebuild_accelerating_index().unwrap();
    assert_eq!(status.dimension, 3);
    assert_eq!(status.off_dimension, 1);
    assert_eq!(status.skipped, 0);
    assert_eq!(status.documents, 4);

    let ann = engine.similar_to(1, 3).unwrap();
    assert_eq!(ids(&ann), ids(&scan));
    for (a, s) in ann.iter().zip(&scan) {
        assert!((a.similarity.unwrap() - s.similarity.unwrap()).abs() < 1e-5);
    }
    assert!(engine
        .degradations()
        .iter()
        .all(|d| d.event.component != "ann_index"));
}

#[test]
fn stale_index_falls_back_to_scan_until_rebuilt() {
    let h = Harness::embedded();
    let engine = h.engine(RetrievalConfig::default());
    engine.rebuild_accelerating_index().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    h.corpus
        .upsert_document(&Document::new(13, "Airway inflammation flares in asthma"))
        .unwrap();
    test_fixtures::embed_corpus(&h.store, h.corpus.as_ref(), h.backend.as_ref());

    let hits = engine
        .search("airway inflammation asthma", SearchMode::Vector, 3)
        .unwrap();
    assert!(ids(&hits).contains(&13), "scan sees the new record");
    let stale: Vec<_> = engine
        .degradations()
        .into_iter()
        .filter(|d| d.event.component == "ann_index")
        .collect();
    assert!(!stale.is_empty());
    assert!(stale.iter().all(|d| d.recovery_status == RecoveryStatus::Active));

    let status = engine.rebuild_accelerating_index().unwrap();
    assert_eq!(status.documents, 12);
    assert!(engine
        .degradations()
        .iter()
        .filter(|d| d.event.component == "ann_index")
        .all(|d| d.recovery_status == RecoveryStatus::Recovered));
}

#[test]
fn vector_mode_without_embedder_falls_back_to_lexical() {
    let h = Harness::embedded();
    let engine = h.lexical_engine();
    let hits = engine
        .search("airway inflammation", SearchMode::Vector, 5)
        .unwrap();
    assert_eq!(top_set(&hits, 2), vec![9, 10]);
    assert!(hits[0].bm25.is_some());
    assert_eq!(engine.metrics().fallbacks, 1);
    assert!(engine
        .degradations()
        .iter()
        .any(|d| d.event.component == "vector"));

    let hybrid = engine
        .search("airway inflammation", SearchMode::Hybrid, 5)
        .unwrap();
    assert_eq!(top_set(&hybrid, 2), vec![9, 10]);
}

#[test]
fn hybrid_with_broken_fts_uses_cosine_order() {
    let h = Harness::embedded();
    let corpus: Arc<dyn ICorpusStore> = Arc::new(BrokenFts(h.dyn_corpus()));
    let engine = RetrievalEngine::new(Arc::clone(&h.store), corpus, RetrievalConfig::default())
        .unwrap()
        .with_embedder(h.backend.clone());

    let hits = engine
        .search("airway inflammation", SearchMode::Hybrid, 5)
        .unwrap();
    assert_eq!(top_set(&hits, 2), vec![9, 10]);
    assert!(hits.iter().all(|h| h.bm25.is_none() && h.similarity.is_some()));

    let lexical = engine
        .search("airway inflammation", SearchMode::Lexical, 5)
        .unwrap();
    assert_eq!(top_set(&lexical, 2), vec![9, 10]);
    assert_eq!(engine.metrics().fallbacks, 2);
}

#[test]
fn both_paths_down_is_an_error() {
    let h = Harness::embedded();
    let corpus: Arc<dyn ICorpusStore> = Arc::new(BrokenFts(h.dyn_corpus()));
    let engine =
        RetrievalEngine::new(Arc::clone(&h.store), corpus, RetrievalConfig::default()).unwrap();

    for mode in [SearchMode::Lexical, SearchMode::Vector, SearchMode::Hybrid] {
        let err = engine.search("airway inflammation", mode, 5).unwrap_err();
        match err {
            SiftError::Retrieval(RetrievalError::NoSearchPath { lexical, vector }) => {
                assert!(lexical.contains("documents_fts"));
                assert!(vector.contains("identity") || vector.contains("embedder"));
            }
            other => panic!("expected NoSearchPath, got {other:?}"),
        }
    }
}

#[test]
fn repeated_query_is_embedded_once() {
    let h = Harness::embedded();
    let engine = h.engine(RetrievalConfig::default());
    let before = h.backend.calls();

    engine.search("blood pressure", SearchMode::Vector, 3).unwrap();
    engine.search("  blood pressure ", SearchMode::Hybrid, 3).unwrap();
    assert_eq!(h.backend.calls(), before + 1);

    let metrics = engine.metrics();
    assert_eq!(metrics.cache_lookups, 2);
    assert_eq!(metrics.cache_hits, 1);

    engine.clear_query_cache();
    engine.search("blood pressure", SearchMode::Vector, 3).unwrap();
    assert_eq!(h.backend.calls(), before + 2);
}

#[test]
fn metrics_count_queries_per_mode() {
    let h = Harness::embedded();
    let engine = h.engine(RetrievalConfig::default());
    engine.search("blood pressure", SearchMode::Lexical, 3).unwrap();
    engine.search("the of", SearchMode::Lexical, 3).unwrap();
    engine.search("blood pressure", SearchMode::Hybrid, 3).unwrap();

    let metrics = engine.metrics();
    assert_eq!(metrics.queries_by_mode.get("lexical"), Some(&2));
    assert_eq!(metrics.hits_by_mode.get("lexical"), Some(&1));
    assert_eq!(metrics.queries_by_mode.get("hybrid"), Some(&1));
    assert!((metrics.hit_rate(SearchMode::Lexical) - 0.5).abs() < 1e-9);
}
