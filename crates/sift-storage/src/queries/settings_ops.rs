//! Process-wide key/value settings with upsert semantics.

use rusqlite::{params, Connection, OptionalExtension};

use sift_core::errors::SiftResult;

use crate::to_storage_err;

pub fn put_setting(conn: &Connection, key: &str, value: &str, now: &str) -> SiftResult<()> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_setting(conn: &Connection, key: &str) -> SiftResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// All settings whose key starts with `prefix`, ordered by key.
pub fn list_settings(conn: &Connection, prefix: &str) -> SiftResult<Vec<(String, String)>> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM settings WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![prefix], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
