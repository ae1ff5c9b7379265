use serde::{Deserialize, Serialize};

/// How the pipeline should react to an adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network, 5xx, timeouts. Requeue and cool down.
    Transient,
    /// The provider answered with the wrong shape. Requeue the whole batch.
    Contract,
    /// Missing credential, bad model path, invalid dimension. Stop the run.
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Contract => "contract",
            Self::Configuration => "configuration",
        }
    }
}

/// Embedding adapter errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    #[error("{provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    HttpStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("batch length mismatch: sent {expected} inputs, got {actual} vectors")]
    BatchLengthMismatch { expected: usize, actual: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("malformed response from {provider}: {reason}")]
    MalformedResponse { provider: String, reason: String },

    #[error("model load failed: {path}: {reason}")]
    ModelLoadFailed { path: String, reason: String },

    #[error("inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("missing credential for backend {backend}")]
    MissingCredential { backend: String },

    #[error("invalid configuration for backend {backend}: {reason}")]
    InvalidConfig { backend: String, reason: String },

    #[error("provider unavailable: {provider}")]
    ProviderUnavailable { provider: String },
}

impl EmbeddingError {
    /// Classify this error for retry decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RequestFailed { .. }
            | Self::InferenceFailed { .. }
            | Self::ProviderUnavailable { .. } => ErrorKind::Transient,
            Self::HttpStatus { status, .. } => match status {
                401 | 403 | 404 => ErrorKind::Configuration,
                _ => ErrorKind::Transient,
            },
            Self::BatchLengthMismatch { .. }
            | Self::DimensionMismatch { .. }
            | Self::MalformedResponse { .. } => ErrorKind::Contract,
            Self::ModelLoadFailed { .. }
            | Self::MissingCredential { .. }
            | Self::InvalidConfig { .. } => ErrorKind::Configuration,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
