//! Removal of jobs and records for documents that left the corpus.

use rusqlite::{params, Connection, Transaction, TransactionBehavior};

use sift_core::errors::SiftResult;

use crate::to_storage_err;

/// Rows removed by a prune.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub jobs: usize,
    pub records: usize,
}

/// Delete jobs and records, for every backend, whose document id is not in
/// `live_ids`.
pub fn prune_missing(conn: &Connection, live_ids: &[i64]) -> SiftResult<PruneReport> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| to_storage_err(e.to_string()))?;
    tx.execute_batch(
        "CREATE TEMP TABLE IF NOT EXISTS live_documents (id INTEGER PRIMARY KEY);
         DELETE FROM temp.live_documents;",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    {
        let mut insert = tx
            .prepare_cached("INSERT OR IGNORE INTO temp.live_documents (id) VALUES (?1)")
            .map_err(|e| to_storage_err(e.to_string()))?;
        for id in live_ids {
            insert
                .execute(params![id])
                .map_err(|e| to_storage_err(e.to_string()))?;
        }
    }
    let jobs = tx
        .execute(
            "DELETE FROM embed_jobs WHERE document_id NOT IN (SELECT id FROM temp.live_documents)",
            [],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let records = tx
        .execute(
            "DELETE FROM embeddings WHERE document_id NOT IN (SELECT id FROM temp.live_documents)",
            [],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    tx.execute_batch("DELETE FROM temp.live_documents;")
        .map_err(|e| to_storage_err(e.to_string()))?;
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(PruneReport { jobs, records })
}
