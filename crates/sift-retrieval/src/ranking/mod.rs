//! Post-fusion ranking stages.

pub mod reranker;

pub use reranker::{apply_rerank, rerank_or_keep, HttpReranker};
