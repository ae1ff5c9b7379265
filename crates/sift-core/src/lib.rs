//! # sift-core
//!
//! Foundation crate for the sift embedding index.
//! Defines the shared types, traits, errors, config, and content hashing.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod errors;
pub mod hashing;
pub mod models;
pub mod traits;
pub mod vector;

// Re-export the most commonly used types at the crate root.
pub use config::SiftConfig;
pub use errors::{EmbeddingError, ErrorKind, SiftError, SiftResult};
pub use hashing::{normalize_text, ContentHash};
pub use models::{BackendKind, ModelIdentity, Precision, SearchHit, SearchMode};
