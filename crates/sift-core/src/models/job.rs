use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BackendKind, Precision};
use crate::hashing::ContentHash;

/// Job lifecycle state as persisted in `embed_jobs.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Done,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// A row of `embed_jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedJob {
    pub document_id: i64,
    pub backend: String,
    pub model: String,
    pub hash: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// State shared by every claimed job regardless of backend.
#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    pub document_id: i64,
    pub backend: BackendKind,
    pub model: String,
    /// Target hash recorded at enqueue time.
    pub job_hash: String,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
}

/// Backend-specific part of a claimed job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobPayload {
    Cloud { dimensions: usize },
    RateLimited { estimated_tokens: u32 },
    Local { precision: Precision },
}

/// A job handed to a worker: state, payload, and the text to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedJob {
    pub state: JobState,
    pub payload: JobPayload,
    /// Normalized primary text as read at pick time.
    pub text: String,
    /// Hash of `text`; written to the record on success.
    pub content_hash: ContentHash,
}

impl ClaimedJob {
    pub fn document_id(&self) -> i64 {
        self.state.document_id
    }
}

/// Queue counts for one (backend, model).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub done: u64,
    /// Unfinished jobs that have failed at least once.
    pub errored: u64,
}
