use super::{ConfigError, EmbeddingError, PipelineError, RetrievalError, StorageError};

/// Top-level error for the workspace. Every subsystem error converts into it.
#[derive(Debug, thiserror::Error)]
pub enum SiftError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SiftResult<T> = Result<T, SiftError>;
