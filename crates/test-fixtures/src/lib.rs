//! Test fixtures shared across the sift workspace: a JSON corpus loader, a
//! seeded in-memory corpus store, and stub embedding backends.

pub mod stubs;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use sift_core::models::Document;
use sift_core::traits::{ICorpusStore, IEmbeddingBackend};
use sift_core::{normalize_text, ContentHash};
use sift_storage::{CompletedItem, EmbeddingStore, SqliteCorpus};

pub use stubs::{
    bag_of_words, AuthFailBackend, FlakyBackend, GatedBackend, PanicBackend, ShortBackend,
    SlowBackend, StubBackend,
};

/// Name of the default corpus fixture.
pub const CLINICAL_NOTES: &str = "corpus/clinical_notes.json";

/// Root directory of the fixture data.
pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

/// A query with the documents a reasonable ranking puts first.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureQuery {
    pub text: String,
    pub expected_top: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusFixture {
    pub name: String,
    pub documents: Vec<Document>,
    #[serde(default)]
    pub queries: Vec<FixtureQuery>,
}

impl CorpusFixture {
    pub fn document(&self, id: i64) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }
}

pub fn load_corpus(relative_path: &str) -> CorpusFixture {
    load_fixture(relative_path)
}

/// An in-memory corpus store holding every fixture document.
///
/// # Panics
/// Panics if the store can't be opened or a document can't be written.
pub fn seeded_corpus(fixture: &CorpusFixture) -> SqliteCorpus {
    let corpus = SqliteCorpus::open_in_memory()
        .unwrap_or_else(|e| panic!("Failed to open corpus: {e}"));
    for doc in &fixture.documents {
        corpus
            .upsert_document(doc)
            .unwrap_or_else(|e| panic!("Failed to seed document {}: {e}", doc.id));
    }
    corpus
}

/// An in-memory corpus with one plain-text document per entry.
pub fn corpus_from_texts(texts: &[(i64, &str)]) -> SqliteCorpus {
    let fixture = CorpusFixture {
        name: "inline".to_string(),
        documents: texts.iter().map(|(id, text)| Document::new(*id, *text)).collect(),
        queries: Vec::new(),
    };
    seeded_corpus(&fixture)
}

/// Embed every non-empty corpus document with `backend` straight into
/// `store`, bypassing the worker pool. Returns records written.
///
/// # Panics
/// Panics on any store, corpus, or backend failure.
pub fn embed_corpus(
    store: &EmbeddingStore,
    corpus: &dyn ICorpusStore,
    backend: &dyn IEmbeddingBackend,
) -> usize {
    let identity = backend.identity();
    let docs = corpus
        .list_documents()
        .unwrap_or_else(|e| panic!("Failed to list documents: {e}"));
    let texts: Vec<(i64, String)> = docs
        .iter()
        .map(|d| (d.id, normalize_text(&d.text)))
        .filter(|(_, t)| !t.is_empty())
        .collect();
    let hashes: Vec<(i64, ContentHash)> = texts
        .iter()
        .map(|(id, t)| (*id, ContentHash::compute(t, identity)))
        .collect();
    store
        .enqueue(identity, &hashes, true)
        .unwrap_or_else(|e| panic!("Failed to enqueue: {e}"));
    let claimed = store
        .claim_pending(identity, texts.len().max(1))
        .unwrap_or_else(|e| panic!("Failed to claim: {e}"));

    let batch: Vec<String> = texts.iter().map(|(_, t)| t.clone()).collect();
    let vectors = backend
        .embed(&batch)
        .unwrap_or_else(|e| panic!("Failed to embed corpus: {e}"));
    let items: Vec<CompletedItem> = hashes
        .into_iter()
        .zip(vectors)
        .filter_map(|((id, hash), vector)| {
            let job = claimed.iter().find(|j| j.document_id == id)?;
            Some(CompletedItem {
                document_id: id,
                claimed_hash: job.hash.clone(),
                content_hash: hash,
                vector,
            })
        })
        .collect();
    store
        .mark_done(identity, &items)
        .unwrap_or_else(|e| panic!("Failed to write records: {e}"))
}
