use serde::{Deserialize, Serialize};

use super::defaults;

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker loops for network backends. Local inference derives its own cap.
    pub concurrency: usize,
    /// Jobs pulled per `pick_batch`.
    pub batch_size: usize,
    /// Re-embed every document regardless of content hash.
    pub rebuild_all: bool,
    /// Pause after a failed batch before the same worker pulls again.
    pub failure_cooldown_ms: u64,
    /// Consecutive failed batches before a worker stops. `None` retries forever.
    pub breaker_threshold: Option<u32>,
    /// Restarts allowed per run for workers that panic.
    pub max_restarts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::DEFAULT_CONCURRENCY,
            batch_size: defaults::DEFAULT_BATCH_SIZE,
            rebuild_all: false,
            failure_cooldown_ms: defaults::DEFAULT_FAILURE_COOLDOWN_MS,
            breaker_threshold: None,
            max_restarts: defaults::DEFAULT_MAX_RESTARTS,
        }
    }
}
