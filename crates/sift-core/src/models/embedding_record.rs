use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One live vector per (document, backend, model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub document_id: i64,
    pub backend: String,
    pub model: String,
    pub dim: usize,
    pub vector: Vec<f32>,
    /// L2 norm of `vector`, computed when the record was written.
    pub norm: f32,
    pub hash: String,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a record the vector scan needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVector {
    pub document_id: i64,
    pub vector: Vec<f32>,
    pub norm: f32,
}

/// Cheap summary of the records for one (backend, model). An accelerating
/// index built from a different fingerprint is stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFingerprint {
    pub count: u64,
    pub max_updated_at: Option<String>,
}
