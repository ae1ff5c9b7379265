//! Accelerating vector index.

pub mod hnsw_index;

pub use hnsw_index::{AnnIndex, AnnParams};
