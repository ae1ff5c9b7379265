use serde::{Deserialize, Serialize};

/// A corpus document. Owned by the corpus store; read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    /// Ordered text fields. The first one is the primary text.
    pub fields: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Bumped by the ingestion side on every edit.
    #[serde(default)]
    pub modified: i64,
}

impl Document {
    pub fn new(id: i64, primary: impl Into<String>) -> Self {
        Self {
            id,
            fields: vec![primary.into()],
            tags: Vec::new(),
            modified: 0,
        }
    }

    pub fn primary_text(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or("")
    }
}

/// The projection the scheduler reads: id, primary text, modification marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    pub id: i64,
    pub text: String,
    pub modified: i64,
}
