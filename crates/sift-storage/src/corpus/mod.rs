//! SqliteCorpus: reference corpus store with an FTS5 index over the
//! normalized primary text. Ingestion writes through `upsert_document`; the
//! pipeline and retrieval read through `ICorpusStore`.

mod schema;

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use sift_core::errors::SiftResult;
use sift_core::models::{Document, DocumentText, LexicalHit};
use sift_core::traits::ICorpusStore;
use sift_core::normalize_text;

use crate::pool::ConnectionPool;
use crate::to_storage_err;

/// SQLite parameter limit headroom for `IN (...)` lookups.
const LOOKUP_CHUNK: usize = 500;

pub struct SqliteCorpus {
    pool: ConnectionPool,
    use_read_pool: bool,
}

impl SqliteCorpus {
    pub fn open(path: &Path) -> SiftResult<Self> {
        let writer = crate::pool::WriteConnection::open(path)?;
        writer.with_conn(schema::apply)?;
        drop(writer);
        Ok(Self {
            pool: ConnectionPool::open(path, 2)?,
            use_read_pool: true,
        })
    }

    pub fn open_in_memory() -> SiftResult<Self> {
        let pool = ConnectionPool::open_in_memory()?;
        pool.writer.with_conn(schema::apply)?;
        Ok(Self {
            pool,
            use_read_pool: false,
        })
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

    /// Insert or replace a document. Bumps `modified` when the caller left it at 0.
    pub fn upsert_document(&self, doc: &Document) -> SiftResult<()> {
        let fields = serde_json::to_string(&doc.fields)?;
        let tags = serde_json::to_string(&doc.tags)?;
        let plain = normalize_text(doc.primary_text());
        self.pool.writer.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, fields, plain, tags, modified)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    fields = excluded.fields,
                    plain = excluded.plain,
                    tags = excluded.tags,
                    modified = CASE WHEN ?5 = 0 THEN documents.modified + 1 ELSE ?5 END",
                params![doc.id, fields, plain, tags, doc.modified],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
            Ok(())
        })
    }

    pub fn delete_document(&self, id: i64) -> SiftResult<bool> {
        self.pool.writer.with_conn(|conn| {
            let n = conn
                .execute("DELETE FROM documents WHERE id = ?1", params![id])
                .map_err(|e| to_storage_err(e.to_string()))?;
            Ok(n > 0)
        })
    }

    pub fn get_document(&self, id: i64) -> SiftResult<Option<Document>> {
        let row = self.with_reader(|conn| {
            conn.query_row(
                "SELECT fields, tags, modified FROM documents WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| to_storage_err(e.to_string()))
        })?;
        let Some((fields, tags, modified)) = row else {
            return Ok(None);
        };
        Ok(Some(Document {
            id,
            fields: serde_json::from_str(&fields)?,
            tags: serde_json::from_str(&tags)?,
            modified,
        }))
    }

    pub fn document_count(&self) -> SiftResult<u64> {
        self.with_reader(|conn| {
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(|e| to_storage_err(e.to_string()))
        })
    }
}

fn primary_field(fields_json: &str) -> SiftResult<String> {
    let fields: Vec<String> = serde_json::from_str(fields_json)?;
    Ok(fields.into_iter().next().unwrap_or_default())
}

impl ICorpusStore for SqliteCorpus {
    fn list_documents(&self) -> SiftResult<Vec<DocumentText>> {
        self.with_reader(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, fields, modified FROM documents ORDER BY id")
                .map_err(|e| to_storage_err(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| to_storage_err(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                let (id, fields, modified) = row.map_err(|e| to_storage_err(e.to_string()))?;
                out.push(DocumentText {
                    id,
                    text: primary_field(&fields)?,
                    modified,
                });
            }
            Ok(out)
        })
    }

    fn texts_for(&self, ids: &[i64]) -> SiftResult<HashMap<i64, String>> {
        let mut out = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT id, fields FROM documents WHERE id IN ({placeholders})");
            let rows: Vec<(i64, String)> = self.with_reader(|conn| {
                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(|e| to_storage_err(e.to_string()))?;
                let rows = stmt
                    .query_map(params_from_iter(chunk.iter()), |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })
                    .map_err(|e| to_storage_err(e.to_string()))?;
                rows.collect::<Result<Vec<_>, _>>()
                    .map_err(|e| to_storage_err(e.to_string()))
            })?;
            for (id, fields) in rows {
                out.insert(id, primary_field(&fields)?);
            }
        }
        Ok(out)
    }

    fn search_lexical(&self, expression: &str, limit: usize) -> SiftResult<Vec<LexicalHit>> {
        if expression.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        self.with_reader(|conn| {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT rowid, bm25(documents_fts) AS cost
                     FROM documents_fts
                     WHERE documents_fts MATCH ?1
                     ORDER BY cost ASC, rowid ASC
                     LIMIT ?2",
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
            let rows = stmt
                .query_map(params![expression, limit as i64], |row| {
                    Ok(LexicalHit {
                        document_id: row.get(0)?,
                        bm25: row.get(1)?,
                    })
                })
                .map_err(|e| to_storage_err(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| to_storage_err(e.to_string()))
        })
    }
}
