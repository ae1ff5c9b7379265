//! embeddings, embed_jobs.

use rusqlite::Connection;

use sift_core::errors::SiftResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> SiftResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS embeddings (
            document_id INTEGER NOT NULL,
            backend     TEXT NOT NULL,
            model       TEXT NOT NULL,
            dim         INTEGER NOT NULL,
            vector      BLOB NOT NULL,
            norm        REAL NOT NULL,
            hash        TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            PRIMARY KEY (document_id, backend, model)
        );
        CREATE INDEX IF NOT EXISTS idx_embeddings_model
            ON embeddings(backend, model);

        CREATE TABLE IF NOT EXISTS embed_jobs (
            document_id INTEGER NOT NULL,
            backend     TEXT NOT NULL,
            model       TEXT NOT NULL,
            hash        TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'in_progress', 'done')),
            attempts    INTEGER NOT NULL DEFAULT 0,
            last_error  TEXT,
            enqueued_at TEXT NOT NULL,
            started_at  TEXT,
            finished_at TEXT,
            PRIMARY KEY (document_id, backend, model)
        );
        CREATE INDEX IF NOT EXISTS idx_embed_jobs_pick
            ON embed_jobs(backend, model, status, enqueued_at);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
