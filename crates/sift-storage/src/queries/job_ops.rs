//! Durable job queue.
//!
//! Every transition runs in one short transaction on the writer. The claim
//! selects and marks in a single IMMEDIATE transaction and re-checks
//! `status = 'pending'` on update, so a job is never handed out twice.

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use sift_core::errors::{SiftResult, StorageError};
use sift_core::models::{EmbedJob, JobCounts, JobStatus};

use super::embedding_ops;
use crate::{parse_ts, to_storage_err};

/// Successful embedding for one claimed job.
#[derive(Debug, Clone)]
pub struct DoneItem<'a> {
    pub document_id: i64,
    /// Job hash observed at claim time.
    pub claimed_hash: &'a str,
    /// Hash of the text that was actually embedded.
    pub content_hash: &'a str,
    pub vector: &'a [f32],
}

fn begin(conn: &Connection) -> SiftResult<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Create or refresh jobs for documents whose fresh hash needs embedding.
///
/// Without `rebuild_all`, a document is skipped when its record already has
/// the fresh hash, or when an unfinished job already targets it. Jobs that
/// are in flight only get their target hash updated, never reset to pending.
pub fn enqueue(
    conn: &Connection,
    backend: &str,
    model: &str,
    items: &[(i64, String)],
    rebuild_all: bool,
    now: &str,
) -> SiftResult<usize> {
    let tx = begin(conn)?;
    let mut count = 0usize;
    {
        let mut job_stmt = tx
            .prepare_cached(
                "SELECT hash, status FROM embed_jobs
                 WHERE document_id = ?1 AND backend = ?2 AND model = ?3",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        let mut retarget = tx
            .prepare_cached(
                "UPDATE embed_jobs SET hash = ?4
                 WHERE document_id = ?1 AND backend = ?2 AND model = ?3",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        let mut upsert = tx
            .prepare_cached(
                "INSERT INTO embed_jobs (document_id, backend, model, hash, status, attempts,
                                         last_error, enqueued_at, started_at, finished_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', 0, NULL, ?5, NULL, NULL)
                 ON CONFLICT(document_id, backend, model) DO UPDATE SET
                    hash = excluded.hash,
                    status = 'pending',
                    attempts = 0,
                    last_error = NULL,
                    enqueued_at = excluded.enqueued_at,
                    started_at = NULL,
                    finished_at = NULL",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;

        for (document_id, hash) in items {
            let existing: Option<(String, String)> = job_stmt
                .query_row(params![document_id, backend, model], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .optional()
                .map_err(|e| to_storage_err(e.to_string()))?;
            let existing = existing
                .map(|(h, s)| parse_status(&s).map(|status| (h, status)))
                .transpose()?;

            if !rebuild_all {
                let record_hash = embedding_ops::get_hash(&tx, *document_id, backend, model)?;
                if record_hash.as_deref() == Some(hash.as_str()) {
                    continue;
                }
                if let Some((job_hash, status)) = &existing {
                    if job_hash == hash && *status != JobStatus::Done {
                        continue;
                    }
                }
            }

            match existing {
                Some((_, JobStatus::InProgress)) => {
                    retarget
                        .execute(params![document_id, backend, model, hash])
                        .map_err(|e| to_storage_err(e.to_string()))?;
                }
                _ => {
                    upsert
                        .execute(params![document_id, backend, model, hash, now])
                        .map_err(|e| to_storage_err(e.to_string()))?;
                }
            }
            count += 1;
        }
    }
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count)
}

/// Atomically claim up to `limit` pending jobs, oldest first.
pub fn claim_pending(
    conn: &Connection,
    backend: &str,
    model: &str,
    limit: usize,
    now: &str,
) -> SiftResult<Vec<EmbedJob>> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let tx = begin(conn)?;
    let mut claimed = Vec::new();
    {
        let mut select = tx
            .prepare_cached(
                "SELECT document_id, backend, model, hash, status, attempts, last_error,
                        enqueued_at, started_at, finished_at
                 FROM embed_jobs
                 WHERE backend = ?1 AND model = ?2 AND status = 'pending'
                 ORDER BY enqueued_at ASC, document_id ASC
                 LIMIT ?3",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        let candidates = select
            .query_map(params![backend, model, limit as i64], row_to_job)
            .map_err(|e| to_storage_err(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_storage_err(e.to_string()))?;

        let mut mark = tx
            .prepare_cached(
                "UPDATE embed_jobs SET status = 'in_progress', started_at = ?4
                 WHERE document_id = ?1 AND backend = ?2 AND model = ?3 AND status = 'pending'",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        for raw in candidates {
            let mut job = raw?;
            let changed = mark
                .execute(params![job.document_id, backend, model, now])
                .map_err(|e| to_storage_err(e.to_string()))?;
            if changed == 1 {
                job.status = JobStatus::InProgress;
                job.started_at = Some(parse_ts(now)?);
                claimed.push(job);
            }
        }
    }
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(claimed)
}

/// Persist vectors and close their jobs.
///
/// A job whose target hash changed while it was in flight goes back to
/// pending instead of done. Items whose job is no longer in flight (pruned or
/// recovered) are skipped so a stale worker never overwrites newer state.
pub fn mark_done(
    conn: &Connection,
    backend: &str,
    model: &str,
    items: &[DoneItem<'_>],
    now: &str,
) -> SiftResult<usize> {
    let tx = begin(conn)?;
    let mut written = 0usize;
    {
        let mut close = tx
            .prepare_cached(
                "UPDATE embed_jobs SET
                    status = CASE WHEN hash = ?4 THEN 'done' ELSE 'pending' END,
                    finished_at = CASE WHEN hash = ?4 THEN ?5 ELSE NULL END,
                    started_at = CASE WHEN hash = ?4 THEN started_at ELSE NULL END
                 WHERE document_id = ?1 AND backend = ?2 AND model = ?3
                   AND status = 'in_progress'",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        for item in items {
            let changed = close
                .execute(params![item.document_id, backend, model, item.claimed_hash, now])
                .map_err(|e| to_storage_err(e.to_string()))?;
            if changed == 0 {
                continue;
            }
            embedding_ops::upsert_record(
                &tx,
                item.document_id,
                backend,
                model,
                item.vector,
                item.content_hash,
                now,
            )?;
            written += 1;
        }
    }
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(written)
}

/// Return in-flight jobs to pending after a failed batch.
pub fn mark_failed(
    conn: &Connection,
    backend: &str,
    model: &str,
    document_ids: &[i64],
    error: &str,
) -> SiftResult<usize> {
    let tx = begin(conn)?;
    let mut changed = 0usize;
    {
        let mut stmt = tx
            .prepare_cached(
                "UPDATE embed_jobs SET
                    status = 'pending',
                    attempts = attempts + 1,
                    last_error = ?4,
                    started_at = NULL
                 WHERE document_id = ?1 AND backend = ?2 AND model = ?3
                   AND status = 'in_progress'",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        for id in document_ids {
            changed += stmt
                .execute(params![id, backend, model, error])
                .map_err(|e| to_storage_err(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(changed)
}

/// Reset in-flight jobs to pending. Scoped to one (backend, model) when given.
pub fn recover_in_progress(conn: &Connection, scope: Option<(&str, &str)>) -> SiftResult<usize> {
    let changed = match scope {
        Some((backend, model)) => conn.execute(
            "UPDATE embed_jobs SET status = 'pending', started_at = NULL
             WHERE status = 'in_progress' AND backend = ?1 AND model = ?2",
            params![backend, model],
        ),
        None => conn.execute(
            "UPDATE embed_jobs SET status = 'pending', started_at = NULL
             WHERE status = 'in_progress'",
            [],
        ),
    }
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(changed)
}

/// Drop a job whose document no longer exists.
pub fn delete_job(conn: &Connection, document_id: i64, backend: &str, model: &str) -> SiftResult<()> {
    conn.execute(
        "DELETE FROM embed_jobs WHERE document_id = ?1 AND backend = ?2 AND model = ?3",
        params![document_id, backend, model],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_job(
    conn: &Connection,
    document_id: i64,
    backend: &str,
    model: &str,
) -> SiftResult<Option<EmbedJob>> {
    conn.query_row(
        "SELECT document_id, backend, model, hash, status, attempts, last_error,
                enqueued_at, started_at, finished_at
         FROM embed_jobs WHERE document_id = ?1 AND backend = ?2 AND model = ?3",
        params![document_id, backend, model],
        row_to_job,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))?
    .transpose()
}

pub fn job_counts(conn: &Connection, backend: &str, model: &str) -> SiftResult<JobCounts> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(status = 'pending'), 0),
                COALESCE(SUM(status = 'in_progress'), 0),
                COALESCE(SUM(status = 'done'), 0),
                COALESCE(SUM(status != 'done' AND attempts > 0), 0)
         FROM embed_jobs WHERE backend = ?1 AND model = ?2",
        params![backend, model],
        |row| {
            Ok(JobCounts {
                total: row.get::<_, i64>(0)? as u64,
                pending: row.get::<_, i64>(1)? as u64,
                in_progress: row.get::<_, i64>(2)? as u64,
                done: row.get::<_, i64>(3)? as u64,
                errored: row.get::<_, i64>(4)? as u64,
            })
        },
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

fn parse_status(raw: &str) -> SiftResult<JobStatus> {
    JobStatus::parse(raw).ok_or_else(|| {
        StorageError::UnknownJobStatus {
            status: raw.to_string(),
        }
        .into()
    })
}

/// Row mapper. Decoding errors are deferred to the caller as `SiftResult`.
fn row_to_job(row: &Row<'_>) -> rusqlite::Result<SiftResult<EmbedJob>> {
    let document_id: i64 = row.get(0)?;
    let backend: String = row.get(1)?;
    let model: String = row.get(2)?;
    let hash: String = row.get(3)?;
    let status: String = row.get(4)?;
    let attempts: i64 = row.get(5)?;
    let last_error: Option<String> = row.get(6)?;
    let enqueued_at: String = row.get(7)?;
    let started_at: Option<String> = row.get(8)?;
    let finished_at: Option<String> = row.get(9)?;

    let build = || -> SiftResult<EmbedJob> {
        Ok(EmbedJob {
            document_id,
            backend,
            model,
            hash,
            status: parse_status(&status)?,
            attempts: attempts as u32,
            last_error,
            enqueued_at: parse_ts(&enqueued_at)?,
            started_at: started_at.as_deref().map(parse_ts).transpose()?,
            finished_at: finished_at.as_deref().map(parse_ts).transpose()?,
        })
    };
    Ok(build())
}
