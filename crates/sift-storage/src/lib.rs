//! # sift-storage
//!
//! SQLite persistence for the embedding index.
//!
//! ## Architecture
//!
//! ```text
//! EmbeddingStore
//! ├── ConnectionPool
//! │   ├── WriteConnection (single writer, serialized)
//! │   └── ReadPool (round-robin readers, WAL)
//! ├── migrations (forward-only, schema_version)
//! └── queries
//!     ├── embedding_ops (records, vector codec, fingerprint)
//!     ├── job_ops (enqueue, atomic claim, done/failed, recovery)
//!     ├── settings_ops (key/value upsert)
//!     └── maintenance (prune removed documents)
//! SqliteCorpus (reference corpus store with FTS5)
//! ```

pub mod corpus;
pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use corpus::SqliteCorpus;
pub use engine::{CompletedItem, EmbeddingStore};

use chrono::{DateTime, SecondsFormat, Utc};
use sift_core::errors::{SiftError, StorageError};

/// Wrap a message as a storage error.
pub(crate) fn to_storage_err(message: impl Into<String>) -> SiftError {
    StorageError::SqliteError {
        message: message.into(),
    }
    .into()
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, SiftError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| to_storage_err(format!("bad timestamp '{raw}': {e}")))
}
