//! Embedding records: upsert, lookup, full scan, fingerprint.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use sift_core::errors::{SiftResult, StorageError};
use sift_core::models::{EmbeddingRecord, IndexFingerprint, StoredVector};
use sift_core::vector::l2_norm;

use crate::{parse_ts, to_storage_err};

/// Write or overwrite the record for one key. The norm is computed here so
/// it always matches the stored vector.
pub fn upsert_record(
    conn: &Connection,
    document_id: i64,
    backend: &str,
    model: &str,
    vector: &[f32],
    hash: &str,
    updated_at: &str,
) -> SiftResult<()> {
    let blob = vector_to_blob(vector);
    let norm = l2_norm(vector);
    conn.prepare_cached(
        "INSERT INTO embeddings (document_id, backend, model, dim, vector, norm, hash, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(document_id, backend, model) DO UPDATE SET
            dim = excluded.dim,
            vector = excluded.vector,
            norm = excluded.norm,
            hash = excluded.hash,
            updated_at = excluded.updated_at",
    )
    .and_then(|mut stmt| {
        stmt.execute(params![
            document_id,
            backend,
            model,
            vector.len() as i64,
            blob,
            norm as f64,
            hash,
            updated_at
        ])
    })
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_record(
    conn: &Connection,
    document_id: i64,
    backend: &str,
    model: &str,
) -> SiftResult<Option<EmbeddingRecord>> {
    let row = conn
        .query_row(
            "SELECT dim, vector, norm, hash, updated_at FROM embeddings
             WHERE document_id = ?1 AND backend = ?2 AND model = ?3",
            params![document_id, backend, model],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let Some((dim, blob, norm, hash, updated_at)) = row else {
        return Ok(None);
    };
    let vector = blob_to_vector(&blob, dim as usize).map_err(|reason| {
        StorageError::CorruptVector {
            document_id,
            reason,
        }
    })?;
    Ok(Some(EmbeddingRecord {
        document_id,
        backend: backend.to_string(),
        model: model.to_string(),
        dim: dim as usize,
        vector,
        norm: norm as f32,
        hash,
        updated_at: parse_ts(&updated_at)?,
    }))
}

/// Stored hash for a key, without decoding the vector.
pub fn get_hash(
    conn: &Connection,
    document_id: i64,
    backend: &str,
    model: &str,
) -> SiftResult<Option<String>> {
    conn.prepare_cached(
        "SELECT hash FROM embeddings WHERE document_id = ?1 AND backend = ?2 AND model = ?3",
    )
    .and_then(|mut stmt| {
        stmt.query_row(params![document_id, backend, model], |row| row.get(0))
            .optional()
    })
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Every vector for one (backend, model). Corrupt blobs are skipped.
pub fn scan_vectors(conn: &Connection, backend: &str, model: &str) -> SiftResult<Vec<StoredVector>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT document_id, dim, vector, norm FROM embeddings
             WHERE backend = ?1 AND model = ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![backend, model], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (document_id, dim, blob, norm) = row.map_err(|e| to_storage_err(e.to_string()))?;
        match blob_to_vector(&blob, dim as usize) {
            Ok(vector) => out.push(StoredVector {
                document_id,
                vector,
                norm: norm as f32,
            }),
            Err(reason) => warn!(document_id, %reason, "skipping corrupt embedding"),
        }
    }
    Ok(out)
}

pub fn record_count(conn: &Connection, backend: &str, model: &str) -> SiftResult<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM embeddings WHERE backend = ?1 AND model = ?2",
        params![backend, model],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n as u64)
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Count and newest write time. Any insert, update, or delete changes it.
pub fn fingerprint(conn: &Connection, backend: &str, model: &str) -> SiftResult<IndexFingerprint> {
    conn.query_row(
        "SELECT COUNT(*), MAX(updated_at) FROM embeddings WHERE backend = ?1 AND model = ?2",
        params![backend, model],
        |row| {
            Ok(IndexFingerprint {
                count: row.get::<_, i64>(0)? as u64,
                max_updated_at: row.get(1)?,
            })
        },
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Convert f32 slice to bytes (little-endian).
pub fn vector_to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes back to an f32 vec, checking the length against `dim`.
pub fn blob_to_vector(bytes: &[u8], dim: usize) -> Result<Vec<f32>, String> {
    if bytes.len() % 4 != 0 {
        return Err(format!("blob length {} is not a multiple of 4", bytes.len()));
    }
    if bytes.len() / 4 != dim {
        return Err(format!("blob holds {} floats, dim says {dim}", bytes.len() / 4));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
