mod corpus;
mod embedding;
mod reranker;

pub use corpus::ICorpusStore;
pub use embedding::IEmbeddingBackend;
pub use reranker::IReranker;
