//! # sift-pipeline
//!
//! Keeps the embedding store in step with the corpus.
//!
//! ## Architecture
//!
//! ```text
//! RunManager (one run per backend identity)
//! ├── JobScheduler
//! │   ├── enqueue (hash-gated, prunes removed documents)
//! │   ├── pick_batch (atomic claim + current text)
//! │   └── complete / fail / recover
//! ├── supervise (JoinSet of blocking workers, restart on panic)
//! │   └── run_worker (pick → embed → persist or requeue → cooldown)
//! └── RunProgress (atomics, snapshot published to settings)
//! ```

pub mod pool;
pub mod progress;
pub mod run_manager;
pub mod scheduler;
pub mod supervisor;
pub mod worker;

pub use pool::{drain_blocking, effective_workers};
pub use progress::RunProgress;
pub use run_manager::{configured_identity, RunHandle, RunManager, RunOutcome};
pub use scheduler::JobScheduler;
pub use supervisor::{supervise, SupervisorReport};
pub use worker::{run_worker, CancelToken, WorkerContext, WorkerExit, WorkerOptions};
