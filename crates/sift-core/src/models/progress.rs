use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a worker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Drained,
    Stopped,
    Failed,
}

/// Snapshot a run publishes to settings at every successful batch boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: String,
    pub backend: String,
    pub model: String,
    pub status: RunStatus,
    /// Items embedded by this run.
    pub processed: u64,
    pub failed_batches: u64,
    pub elapsed_secs: f64,
    /// Items per second over the run so far.
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
}

/// What a progress poller sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub backend: String,
    pub model: String,
    pub total: u64,
    pub embedded: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub errors: u64,
    pub rate: f64,
    pub eta_seconds: Option<u64>,
    pub status: Option<RunStatus>,
}
