//! Forward-only schema migrations tracked in `schema_version`.

mod v001_embedding_tables;
mod v002_settings;

use rusqlite::Connection;
use tracing::info;

use sift_core::errors::{SiftResult, StorageError};

use crate::to_storage_err;

type Migration = fn(&Connection) -> SiftResult<()>;

const MIGRATIONS: &[(u32, Migration)] = &[
    (1, v001_embedding_tables::migrate),
    (2, v002_settings::migrate),
];

/// Latest schema version this build knows about.
pub const LATEST_VERSION: u32 = 2;

/// Apply every migration newer than the recorded version.
pub fn run_migrations(conn: &Connection) -> SiftResult<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let current = current_version(conn)?;
    for (version, migrate) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| to_storage_err(e.to_string()))?;
        migrate(&tx).map_err(|e| StorageError::MigrationFailed {
            version: *version,
            reason: e.to_string(),
        })?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
        info!(version, "applied migration");
    }
    Ok(LATEST_VERSION.max(current))
}

/// Highest applied version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> SiftResult<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
