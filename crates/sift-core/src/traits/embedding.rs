use crate::errors::EmbeddingError;
use crate::models::{ClaimedJob, JobPayload, ModelIdentity};

/// A backend that turns a batch of texts into vectors.
///
/// Implementations return one vector per input, in input order, each of
/// length `dimensions()`. Errors carry an `ErrorKind` the worker branches on.
pub trait IEmbeddingBackend: Send + Sync {
    /// Backend, model, and variant of the vectors this backend produces.
    fn identity(&self) -> &ModelIdentity;

    /// Output dimensionality.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed claimed jobs. Backends that use their payload override this.
    fn embed_jobs(&self, jobs: &[ClaimedJob]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let texts: Vec<String> = jobs.iter().map(|j| j.text.clone()).collect();
        self.embed(&texts)
    }

    /// Payload attached to a job for this backend.
    fn payload_for(&self, _text: &str) -> JobPayload {
        JobPayload::Cloud {
            dimensions: self.dimensions(),
        }
    }

    /// Backend name for logging.
    fn name(&self) -> &str {
        self.identity().backend.as_str()
    }

    fn model(&self) -> &str {
        &self.identity().model
    }
}
