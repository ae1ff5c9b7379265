//! documents + external-content FTS5 index kept in sync by triggers.

use rusqlite::Connection;

use sift_core::errors::SiftResult;

use crate::to_storage_err;

pub fn apply(conn: &Connection) -> SiftResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id       INTEGER PRIMARY KEY,
            fields   TEXT NOT NULL,
            plain    TEXT NOT NULL,
            tags     TEXT NOT NULL DEFAULT '[]',
            modified INTEGER NOT NULL DEFAULT 0
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
            plain,
            content='documents',
            content_rowid='id',
            tokenize='unicode61 remove_diacritics 2'
        );

        CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
            INSERT INTO documents_fts(rowid, plain) VALUES (new.id, new.plain);
        END;

        CREATE TRIGGER IF NOT EXISTS documents_ad AFTER DELETE ON documents BEGIN
            INSERT INTO documents_fts(documents_fts, rowid, plain)
                VALUES ('delete', old.id, old.plain);
        END;

        CREATE TRIGGER IF NOT EXISTS documents_au AFTER UPDATE ON documents BEGIN
            INSERT INTO documents_fts(documents_fts, rowid, plain)
                VALUES ('delete', old.id, old.plain);
            INSERT INTO documents_fts(rowid, plain) VALUES (new.id, new.plain);
        END;
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
