//! Worker counts and a synchronous drain for callers without a runtime.

use std::thread;

use sift_core::config::defaults::{LOCAL_CONCURRENCY_DIVISOR, LOCAL_MAX_WORKERS};
use sift_core::errors::SiftResult;
use sift_core::models::BackendKind;

use crate::worker::{run_worker, WorkerContext, WorkerExit};

/// Worker loops for a backend. Local inference saturates the CPU with far
/// fewer loops than a network backend needs to hide latency.
pub fn effective_workers(kind: BackendKind, concurrency: usize) -> usize {
    match kind {
        BackendKind::Local => (concurrency / LOCAL_CONCURRENCY_DIVISOR).clamp(1, LOCAL_MAX_WORKERS),
        BackendKind::OpenAi | BackendKind::Gemini => concurrency.max(1),
    }
}

/// Run `workers` loops on scoped threads and wait for all of them.
pub fn drain_blocking(ctx: &WorkerContext, workers: usize) -> Vec<SiftResult<WorkerExit>> {
    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers.max(1))
            .map(|worker| scope.spawn(move || run_worker(worker, ctx)))
            .collect();
        handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_workers_are_capped() {
        assert_eq!(effective_workers(BackendKind::Local, 1), 1);
        assert_eq!(effective_workers(BackendKind::Local, 64), 1);
        assert_eq!(effective_workers(BackendKind::Local, 128), 2);
        assert_eq!(effective_workers(BackendKind::Local, 10_000), 4);
    }

    #[test]
    fn network_workers_follow_concurrency() {
        assert_eq!(effective_workers(BackendKind::OpenAi, 128), 128);
        assert_eq!(effective_workers(BackendKind::Gemini, 0), 1);
    }
}
