//! RunManager: one embedding run per active (backend, model), started and
//! stopped independently of retrieval.

use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::info;

use sift_core::config::SiftConfig;
use sift_core::errors::{ConfigError, PipelineError, SiftResult};
use sift_core::models::{BackendKind, ModelIdentity, Precision, ProgressReport, RunStatus};
use sift_core::traits::{ICorpusStore, IEmbeddingBackend};
use sift_embeddings::create_backend;
use sift_observability::tracing_setup::events;
use sift_storage::EmbeddingStore;

use crate::pool::effective_workers;
use crate::progress::{self, RunProgress};
use crate::scheduler::JobScheduler;
use crate::supervisor::{supervise, SupervisorReport};
use crate::worker::{CancelToken, WorkerContext, WorkerOptions};

/// Caller's reference to a started run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub run_id: String,
    pub identity: ModelIdentity,
    /// Jobs created or refreshed when the run started.
    pub enqueued: usize,
    pub workers: usize,
}

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub processed: u64,
    pub failed_batches: u64,
    pub restarts: u32,
    /// The configuration error that stopped the run, reported once.
    pub error: Option<String>,
}

struct ActiveRun {
    handle: RunHandle,
    cancel: CancelToken,
    progress: Arc<RunProgress>,
    task: Mutex<Option<JoinHandle<RunOutcome>>>,
}

impl ActiveRun {
    fn is_finished(&self) -> bool {
        match self.task.lock() {
            Ok(task) => task.as_ref().map_or(true, JoinHandle::is_finished),
            Err(_) => true,
        }
    }
}

pub struct RunManager {
    store: Arc<EmbeddingStore>,
    corpus: Arc<dyn ICorpusStore>,
    config: SiftConfig,
    runtime: Handle,
    runs: DashMap<ModelIdentity, Arc<ActiveRun>>,
}

impl RunManager {
    /// Create a manager on the current tokio runtime.
    ///
    /// Every `in_progress` job in the store is returned to pending first:
    /// no run of this process can own them yet.
    pub fn new(
        store: Arc<EmbeddingStore>,
        corpus: Arc<dyn ICorpusStore>,
        config: SiftConfig,
    ) -> SiftResult<Self> {
        let runtime = Handle::try_current().map_err(|e| PipelineError::RuntimeUnavailable {
            reason: e.to_string(),
        })?;
        Self::with_runtime(store, corpus, config, runtime)
    }

    pub fn with_runtime(
        store: Arc<EmbeddingStore>,
        corpus: Arc<dyn ICorpusStore>,
        config: SiftConfig,
        runtime: Handle,
    ) -> SiftResult<Self> {
        let recovered = store.recover_in_progress(None)?;
        events::jobs_recovered("startup", recovered);
        Ok(Self {
            store,
            corpus,
            config,
            runtime,
            runs: DashMap::new(),
        })
    }

    pub fn store(&self) -> &Arc<EmbeddingStore> {
        &self.store
    }

    /// Build the configured adapter for `kind` and start a run with it.
    pub fn start_run(&self, kind: BackendKind, rebuild_all: bool) -> SiftResult<RunHandle> {
        let backend = create_backend(&self.config.embedding, kind)?;
        self.start_run_with(backend, rebuild_all)
    }

    /// Start a run with an already-built adapter.
    pub fn start_run_with(
        &self,
        backend: Arc<dyn IEmbeddingBackend>,
        rebuild_all: bool,
    ) -> SiftResult<RunHandle> {
        let identity = backend.identity().clone();
        let kind = identity.backend;

        let entry = match self.runs.entry(identity.clone()) {
            Entry::Occupied(existing) if !existing.get().is_finished() => {
                return Err(PipelineError::RunAlreadyActive {
                    backend: identity.backend.as_str().to_string(),
                    model: identity.model.clone(),
                }
                .into());
            }
            entry => entry,
        };

        let scheduler = Arc::new(JobScheduler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.corpus),
            backend,
        ));
        let enqueued = scheduler.enqueue(rebuild_all)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let workers = effective_workers(kind, self.config.pipeline.concurrency);
        let progress = Arc::new(RunProgress::new(run_id.clone(), identity.clone()));
        let cancel = CancelToken::new();
        let ctx = Arc::new(WorkerContext::new(
            scheduler,
            Arc::clone(&progress),
            cancel.clone(),
            WorkerOptions::from_config(&self.config.pipeline),
        ));

        events::run_started(&run_id, kind.as_str(), &identity.model, workers, enqueued);
        progress.publish(&self.store)?;

        let max_restarts = self.config.pipeline.max_restarts;
        let store = Arc::clone(&self.store);
        let task = self.runtime.spawn({
            let progress = Arc::clone(&progress);
            let cancel = cancel.clone();
            async move {
                let report = supervise(ctx, workers, max_restarts).await;
                finish_run(&store, &progress, &cancel, report)
            }
        });

        let handle = RunHandle {
            run_id,
            identity,
            enqueued,
            workers,
        };
        let run = Arc::new(ActiveRun {
            handle: handle.clone(),
            cancel,
            progress,
            task: Mutex::new(Some(task)),
        });
        match entry {
            Entry::Occupied(mut slot) => {
                slot.insert(run);
            }
            Entry::Vacant(slot) => {
                slot.insert(run);
            }
        }
        Ok(handle)
    }

    /// Ask a run to stop. Workers finish their current batch, then exit.
    pub fn stop_run(&self, handle: &RunHandle) -> SiftResult<()> {
        let run = self.find(handle)?;
        info!(run_id = %handle.run_id, "stop requested");
        run.cancel.cancel();
        Ok(())
    }

    /// Wait for a run to end and take its outcome.
    pub async fn wait(&self, handle: &RunHandle) -> SiftResult<RunOutcome> {
        let run = self.find(handle)?;
        let task = run
            .task
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .ok_or_else(|| PipelineError::RunNotFound {
                run_id: handle.run_id.clone(),
            })?;
        let outcome = task.await.map_err(|e| PipelineError::RuntimeUnavailable {
            reason: e.to_string(),
        })?;
        self.runs
            .remove_if(&handle.identity, |_, r| r.handle.run_id == handle.run_id);
        Ok(outcome)
    }

    /// Handles of runs still working.
    pub fn active_runs(&self) -> Vec<RunHandle> {
        self.runs
            .iter()
            .filter(|r| !r.value().is_finished())
            .map(|r| r.value().handle.clone())
            .collect()
    }

    /// Progress for `kind`, or for the configured active backend.
    pub fn progress(&self, kind: Option<BackendKind>) -> SiftResult<ProgressReport> {
        let kind = match kind {
            Some(kind) => kind,
            None => self.config.active_backend()?,
        };
        let live = self
            .runs
            .iter()
            .find(|r| r.key().backend == kind)
            .map(|r| (r.key().clone(), r.value().progress.snapshot()));
        match live {
            Some((identity, snapshot)) => progress::report(&self.store, &identity, Some(snapshot)),
            None => {
                let identity = configured_identity(&self.config, kind)?;
                progress::report(&self.store, &identity, None)
            }
        }
    }

    fn find(&self, handle: &RunHandle) -> SiftResult<Arc<ActiveRun>> {
        self.runs
            .get(&handle.identity)
            .filter(|r| r.handle.run_id == handle.run_id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| {
                PipelineError::RunNotFound {
                    run_id: handle.run_id.clone(),
                }
                .into()
            })
    }
}

fn finish_run(
    store: &EmbeddingStore,
    progress: &RunProgress,
    cancel: &CancelToken,
    report: SupervisorReport,
) -> RunOutcome {
    let status = if report.fatal.is_some() {
        RunStatus::Failed
    } else if report.all_drained() {
        RunStatus::Drained
    } else if cancel.is_cancelled() && report.failed == 0 {
        RunStatus::Stopped
    } else {
        RunStatus::Failed
    };
    progress.set_status(status);
    if let Err(e) = progress.publish(store) {
        tracing::warn!(run_id = %progress.run_id(), error = %e, "final progress snapshot not written");
    }

    let outcome = RunOutcome {
        run_id: progress.run_id().to_string(),
        status,
        processed: progress.processed(),
        failed_batches: progress.failed_batches(),
        restarts: report.restarts,
        error: report
            .fatal
            .map(|e| e.to_string())
            .or_else(|| report.errors.into_iter().next()),
    };
    let status_name = match status {
        RunStatus::Running => "running",
        RunStatus::Drained => "drained",
        RunStatus::Stopped => "stopped",
        RunStatus::Failed => "failed",
    };
    events::run_finished(&outcome.run_id, status_name, outcome.processed, outcome.failed_batches);
    outcome
}

/// The identity the configured adapter for `kind` would have, without
/// building it.
pub fn configured_identity(config: &SiftConfig, kind: BackendKind) -> Result<ModelIdentity, ConfigError> {
    let embedding = &config.embedding;
    match kind {
        BackendKind::OpenAi => Ok(ModelIdentity::with_dimensions(
            kind,
            embedding.openai.model.clone(),
            embedding.openai.dimensions,
        )),
        BackendKind::Gemini => Ok(ModelIdentity::with_dimensions(
            kind,
            embedding.gemini.model.clone(),
            embedding.gemini.dimensions,
        )),
        BackendKind::Local => {
            let precision = Precision::parse(&embedding.local.precision).ok_or_else(|| {
                ConfigError::Invalid {
                    field: "embedding.local.precision".to_string(),
                    reason: format!("unknown precision '{}'", embedding.local.precision),
                }
            })?;
            Ok(ModelIdentity::local(
                embedding.local.model.clone(),
                precision,
                embedding.local.dimensions,
            ))
        }
    }
}
