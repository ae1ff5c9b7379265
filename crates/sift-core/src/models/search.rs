use serde::{Deserialize, Serialize};

/// Which signals a query uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Lexical,
    Vector,
    Hybrid,
}

impl SearchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "fts" => Some(Self::Lexical),
            "vector" | "semantic" => Some(Self::Vector),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

/// One full-text match. `bm25` is a cost: lower is better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalHit {
    pub document_id: i64,
    pub bm25: f64,
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document_id: i64,
    /// Final score for the mode that produced the hit. Higher is better.
    pub score: f64,
    /// Raw BM25 cost, when the document matched lexically.
    pub bm25: Option<f64>,
    /// Cosine similarity, when the document was scored semantically.
    pub similarity: Option<f64>,
    /// Score assigned by the external reranker.
    pub rerank_score: Option<f64>,
}

impl SearchHit {
    pub fn new(document_id: i64, score: f64) -> Self {
        Self {
            document_id,
            score,
            bm25: None,
            similarity: None,
            rerank_score: None,
        }
    }
}

/// Result of an accelerating index rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub backend: String,
    pub model: String,
    pub documents: usize,
    pub dimension: usize,
    /// Records of another dimension, compared by overlap cosine alongside
    /// the index.
    pub off_dimension: usize,
    /// Records skipped because their vector was non-finite or zero.
    pub skipped: usize,
    pub build_ms: u64,
}
