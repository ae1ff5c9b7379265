//! # sift-retrieval
//!
//! Hybrid retrieval over the corpus and the embedding store.
//!
//! ## Architecture
//!
//! ```text
//! RetrievalEngine
//! ├── lexical: keywords → FTS5 expression → BM25 hits
//! │   └── lexical mode: RRF(BM25 order, trigram order)
//! ├── vector: query embedding (cached) → ANN index if fresh, else scan
//! ├── hybrid: cosine ^ exp(α·(½ − lexical strength))
//! ├── rerank: optional HTTP reranker over the top K, order kept on failure
//! └── similar_to / rebuild_accelerating_index
//! ```

pub mod engine;
pub mod index;
pub mod keywords;
pub mod ranking;
pub mod search;

pub use engine::RetrievalEngine;
pub use index::{AnnIndex, AnnParams};
pub use keywords::{extract_keywords, lexical_expression};
pub use ranking::HttpReranker;
