//! Supervised worker group: a `JoinSet` of blocking worker loops with
//! restart-on-panic.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::error;

use sift_core::errors::EmbeddingError;
use sift_observability::tracing_setup::events;
use sift_observability::worker_span;

use crate::worker::{run_worker, WorkerContext, WorkerExit};

/// How a worker task ended.
enum TaskEnd {
    Exited(WorkerExit),
    Errored(String),
    Panicked(String),
}

/// What the group did, once every worker has ended.
#[derive(Debug, Default)]
pub struct SupervisorReport {
    pub drained: usize,
    pub cancelled: usize,
    pub breaker_open: usize,
    /// Workers that ended on a store error or exhausted their restarts.
    pub failed: usize,
    pub restarts: u32,
    pub errors: Vec<String>,
    /// First configuration error raised by any worker.
    pub fatal: Option<EmbeddingError>,
}

impl SupervisorReport {
    pub fn all_drained(&self) -> bool {
        self.fatal.is_none()
            && self.failed == 0
            && self.breaker_open == 0
            && self.cancelled == 0
            && self.drained > 0
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn spawn_worker(set: &mut JoinSet<(usize, TaskEnd)>, ctx: &Arc<WorkerContext>, worker: usize) {
    let ctx = Arc::clone(ctx);
    let span = worker_span!(ctx.progress.run_id(), worker);
    set.spawn_blocking(move || {
        let _guard = span.enter();
        let end = match catch_unwind(AssertUnwindSafe(|| run_worker(worker, &ctx))) {
            Ok(Ok(exit)) => TaskEnd::Exited(exit),
            Ok(Err(e)) => TaskEnd::Errored(e.to_string()),
            Err(payload) => TaskEnd::Panicked(panic_message(payload)),
        };
        (worker, end)
    });
}

/// Run `workers` loops and supervise them until all have ended.
///
/// A panicking worker is restarted up to `max_restarts` times across the
/// run. Jobs it held stay `in_progress` until the next startup recovery.
pub async fn supervise(ctx: Arc<WorkerContext>, workers: usize, max_restarts: u32) -> SupervisorReport {
    let mut set = JoinSet::new();
    for worker in 0..workers.max(1) {
        spawn_worker(&mut set, &ctx, worker);
    }

    let mut report = SupervisorReport::default();
    while let Some(joined) = set.join_next().await {
        let (worker, end) = match joined {
            Ok(done) => done,
            Err(e) => {
                error!("embedding worker task crashed: {e}");
                report.failed += 1;
                report.errors.push(e.to_string());
                continue;
            }
        };
        match end {
            TaskEnd::Exited(WorkerExit::Drained) => report.drained += 1,
            TaskEnd::Exited(WorkerExit::Cancelled | WorkerExit::Fatal(_)) => report.cancelled += 1,
            TaskEnd::Exited(WorkerExit::BreakerOpen { .. }) => report.breaker_open += 1,
            TaskEnd::Errored(reason) => {
                error!(worker, error = %reason, "embedding worker stopped on error");
                report.failed += 1;
                report.errors.push(reason);
            }
            TaskEnd::Panicked(reason) => {
                if report.restarts < max_restarts && !ctx.cancel.is_cancelled() {
                    report.restarts += 1;
                    events::worker_restarted(worker, report.restarts, &reason);
                    spawn_worker(&mut set, &ctx, worker);
                } else {
                    error!(worker, reason = %reason, "embedding worker panicked, not restarting");
                    report.failed += 1;
                    report.errors.push(format!("worker {worker} panicked: {reason}"));
                }
            }
        }
    }

    report.fatal = ctx.fatal_error();
    report
}
