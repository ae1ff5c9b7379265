//! Search paths: lexical (FTS5 + trigram), vector (scan), hybrid modulation,
//! and rank fusion.

pub mod hybrid;
pub mod lexical;
pub mod rrf_fusion;
pub mod trigram;
pub mod vector;

pub use rrf_fusion::{fuse, RrfCandidate};
pub use vector::QueryVector;
