/// Run lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("a run is already active for {backend}/{model}")]
    RunAlreadyActive { backend: String, model: String },

    #[error("worker {worker} panicked: {reason}")]
    WorkerPanicked { worker: usize, reason: String },

    #[error("runtime unavailable: {reason}")]
    RuntimeUnavailable { reason: String },
}
