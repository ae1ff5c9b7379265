//! EmbeddingStore: owns the ConnectionPool and exposes the record, queue,
//! and settings operations keyed by model identity.

use std::path::Path;

use chrono::Utc;
use rusqlite::Connection;

use sift_core::config::StorageConfig;
use sift_core::errors::SiftResult;
use sift_core::models::{
    EmbedJob, EmbeddingRecord, IndexFingerprint, JobCounts, ModelIdentity, StoredVector,
};
use sift_core::ContentHash;

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries::job_ops::DoneItem;
use crate::queries::maintenance::PruneReport;
use crate::queries::{embedding_ops, job_ops, maintenance, settings_ops};
use crate::format_ts;

/// A successful embedding, ready to persist.
#[derive(Debug, Clone)]
pub struct CompletedItem {
    pub document_id: i64,
    pub claimed_hash: String,
    pub content_hash: ContentHash,
    pub vector: Vec<f32>,
}

/// The embedding store: records, job queue, settings.
pub struct EmbeddingStore {
    pool: ConnectionPool,
    /// When true, reads go through the read pool (file-backed mode).
    /// In-memory readers are isolated databases, so reads use the writer.
    use_read_pool: bool,
}

impl EmbeddingStore {
    /// Open a store backed by a file on disk.
    pub fn open(path: &Path) -> SiftResult<Self> {
        Self::open_with_pool_size(path, 4)
    }

    pub fn open_with_config(config: &StorageConfig) -> SiftResult<Self> {
        Self::open_with_pool_size(Path::new(&config.db_path), config.read_pool_size)
    }

    fn open_with_pool_size(path: &Path, read_pool_size: usize) -> SiftResult<Self> {
        // Writer first: it creates the file and the schema readers attach to.
        let writer_only = crate::pool::WriteConnection::open(path)?;
        writer_only.with_conn(|conn| migrations::run_migrations(conn).map(|_| ()))?;
        drop(writer_only);

        let pool = ConnectionPool::open(path, read_pool_size)?;
        Ok(Self {
            pool,
            use_read_pool: true,
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> SiftResult<Self> {
        let pool = ConnectionPool::open_in_memory()?;
        pool.writer
            .with_conn(|conn| migrations::run_migrations(conn).map(|_| ()))?;
        Ok(Self {
            pool,
            use_read_pool: false,
        })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn with_reader<F, T>(&self, f: F) -> SiftResult<T>
    where
        F: FnOnce(&Connection) -> SiftResult<T>,
    {
        if self.use_read_pool {
            self.pool.readers.with_conn(f)
        } else {
            self.pool.writer.with_conn(f)
        }
    }

    fn with_writer<F, T>(&self, f: F) -> SiftResult<T>
    where
        F: FnOnce(&Connection) -> SiftResult<T>,
    {
        self.pool.writer.with_conn(f)
    }

    // --- Job queue ---

    /// Create or refresh jobs for `(document_id, fresh_hash)` pairs.
    pub fn enqueue(
        &self,
        identity: &ModelIdentity,
        items: &[(i64, ContentHash)],
        rebuild_all: bool,
    ) -> SiftResult<usize> {
        let now = format_ts(Utc::now());
        let owned: Vec<(i64, String)> = items
            .iter()
            .map(|(id, hash)| (*id, hash.as_str().to_string()))
            .collect();
        self.with_writer(|conn| {
            job_ops::enqueue(
                conn,
                identity.backend.as_str(),
                &identity.model,
                &owned,
                rebuild_all,
                &now,
            )
        })
    }

    /// Atomically claim up to `limit` pending jobs, oldest first.
    pub fn claim_pending(&self, identity: &ModelIdentity, limit: usize) -> SiftResult<Vec<EmbedJob>> {
        let now = format_ts(Utc::now());
        self.with_writer(|conn| {
            job_ops::claim_pending(conn, identity.backend.as_str(), &identity.model, limit, &now)
        })
    }

    /// Write records and close jobs in one transaction. Returns records written.
    pub fn mark_done(&self, identity: &ModelIdentity, items: &[CompletedItem]) -> SiftResult<usize> {
        let now = format_ts(Utc::now());
        let borrowed: Vec<DoneItem<'_>> = items
            .iter()
            .map(|item| DoneItem {
                document_id: item.document_id,
                claimed_hash: &item.claimed_hash,
                content_hash: item.content_hash.as_str(),
                vector: &item.vector,
            })
            .collect();
        self.with_writer(|conn| {
            job_ops::mark_done(conn, identity.backend.as_str(), &identity.model, &borrowed, &now)
        })
    }

    /// Requeue in-flight jobs with `attempts + 1` and the error message.
    pub fn mark_failed(
        &self,
        identity: &ModelIdentity,
        document_ids: &[i64],
        error: &str,
    ) -> SiftResult<usize> {
        self.with_writer(|conn| {
            job_ops::mark_failed(conn, identity.backend.as_str(), &identity.model, document_ids, error)
        })
    }

    /// Reset `in_progress` jobs to pending; all identities when `None`.
    pub fn recover_in_progress(&self, identity: Option<&ModelIdentity>) -> SiftResult<usize> {
        self.with_writer(|conn| {
            job_ops::recover_in_progress(
                conn,
                identity.map(|i| (i.backend.as_str(), i.model.as_str())),
            )
        })
    }

    pub fn delete_job(&self, identity: &ModelIdentity, document_id: i64) -> SiftResult<()> {
        self.with_writer(|conn| {
            job_ops::delete_job(conn, document_id, identity.backend.as_str(), &identity.model)
        })
    }

    pub fn get_job(&self, identity: &ModelIdentity, document_id: i64) -> SiftResult<Option<EmbedJob>> {
        self.with_reader(|conn| {
            job_ops::get_job(conn, document_id, identity.backend.as_str(), &identity.model)
        })
    }

    pub fn job_counts(&self, identity: &ModelIdentity) -> SiftResult<JobCounts> {
        self.with_reader(|conn| {
            job_ops::job_counts(conn, identity.backend.as_str(), &identity.model)
        })
    }

    // --- Records ---

    pub fn get_record(
        &self,
        identity: &ModelIdentity,
        document_id: i64,
    ) -> SiftResult<Option<EmbeddingRecord>> {
        self.with_reader(|conn| {
            embedding_ops::get_record(conn, document_id, identity.backend.as_str(), &identity.model)
        })
    }

    pub fn scan_vectors(&self, identity: &ModelIdentity) -> SiftResult<Vec<StoredVector>> {
        self.with_reader(|conn| {
            embedding_ops::scan_vectors(conn, identity.backend.as_str(), &identity.model)
        })
    }

    pub fn record_count(&self, identity: &ModelIdentity) -> SiftResult<u64> {
        self.with_reader(|conn| {
            embedding_ops::record_count(conn, identity.backend.as_str(), &identity.model)
        })
    }

    pub fn fingerprint(&self, identity: &ModelIdentity) -> SiftResult<IndexFingerprint> {
        self.with_reader(|conn| {
            embedding_ops::fingerprint(conn, identity.backend.as_str(), &identity.model)
        })
    }

    // --- Settings ---

    pub fn put_setting(&self, key: &str, value: &str) -> SiftResult<()> {
        let now = format_ts(Utc::now());
        self.with_writer(|conn| settings_ops::put_setting(conn, key, value, &now))
    }

    pub fn get_setting(&self, key: &str) -> SiftResult<Option<String>> {
        self.with_reader(|conn| settings_ops::get_setting(conn, key))
    }

    pub fn list_settings(&self, prefix: &str) -> SiftResult<Vec<(String, String)>> {
        self.with_reader(|conn| settings_ops::list_settings(conn, prefix))
    }

    // --- Maintenance ---

    /// Drop jobs and records for documents that are no longer in the corpus.
    pub fn prune_missing(&self, live_ids: &[i64]) -> SiftResult<PruneReport> {
        self.with_writer(|conn| maintenance::prune_missing(conn, live_ids))
    }
}
