/// Retrieval engine errors.
///
/// Degraded modes (missing index, failed rerank) are recovered inside the
/// engine; only `NoSearchPath` reaches a query caller.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("lexical search unavailable: {reason}")]
    LexicalUnavailable { reason: String },

    #[error("vector search unavailable: {reason}")]
    VectorUnavailable { reason: String },

    #[error("no search path available (lexical: {lexical}; vector: {vector})")]
    NoSearchPath { lexical: String, vector: String },

    #[error("accelerating index build failed: {reason}")]
    IndexBuildFailed { reason: String },

    #[error("reranker failed: {reason}")]
    RerankFailed { reason: String },
}
