use std::collections::HashMap;

use crate::errors::SiftResult;
use crate::models::{DocumentText, LexicalHit};

/// The document store the pipeline reads from. Ingestion lives elsewhere.
pub trait ICorpusStore: Send + Sync {
    /// Every document with its raw primary text and modification marker.
    fn list_documents(&self) -> SiftResult<Vec<DocumentText>>;

    /// Raw primary text for the given ids. Missing ids are absent from the map.
    fn texts_for(&self, ids: &[i64]) -> SiftResult<HashMap<i64, String>>;

    /// Full-text search. Hits are ordered by BM25 cost ascending.
    fn search_lexical(&self, expression: &str, limit: usize) -> SiftResult<Vec<LexicalHit>>;
}
