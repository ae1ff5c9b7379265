mod backend;
mod degradation_event;
mod document;
mod embedding_record;
mod job;
mod progress;
mod search;

pub use backend::{BackendKind, ModelIdentity, Precision};
pub use degradation_event::DegradationEvent;
pub use document::{Document, DocumentText};
pub use embedding_record::{EmbeddingRecord, IndexFingerprint, StoredVector};
pub use job::{ClaimedJob, EmbedJob, JobCounts, JobPayload, JobState, JobStatus};
pub use progress::{ProgressReport, RunSnapshot, RunStatus};
pub use search::{IndexStatus, LexicalHit, SearchHit, SearchMode};
