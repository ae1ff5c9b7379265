use crate::errors::SiftResult;

/// External relevance scorer for a shortlist.
pub trait IReranker: Send + Sync {
    /// One score per document, in input order. Higher is more relevant.
    fn rerank(&self, query: &str, documents: &[String]) -> SiftResult<Vec<f64>>;
}
