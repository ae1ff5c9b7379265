//! Backend registry.
//!
//! The factory builds exactly the backend that was asked for. A missing
//! credential, model path, or invalid dimension is a `Configuration` error;
//! there is no fallback to another backend.

pub mod gemini_backend;
pub mod http;
pub mod local_backend;
pub mod openai_backend;

pub use gemini_backend::GeminiBackend;
pub use http::RetryPolicy;
pub use local_backend::LocalBackend;
pub use openai_backend::OpenAiBackend;

use std::sync::Arc;

use sift_core::config::{EmbeddingConfig, SiftConfig};
use sift_core::errors::EmbeddingError;
use sift_core::models::BackendKind;
use sift_core::traits::IEmbeddingBackend;
use tracing::info;

/// Build the backend for `kind` from its config table.
pub fn create_backend(
    config: &EmbeddingConfig,
    kind: BackendKind,
) -> Result<Arc<dyn IEmbeddingBackend>, EmbeddingError> {
    let backend: Arc<dyn IEmbeddingBackend> = match kind {
        BackendKind::OpenAi => Arc::new(OpenAiBackend::new(&config.openai)?),
        BackendKind::Gemini => Arc::new(GeminiBackend::new(&config.gemini)?),
        BackendKind::Local => Arc::new(LocalBackend::new(&config.local)?),
    };
    info!(
        backend = kind.as_str(),
        model = %backend.identity().model,
        dimensions = backend.dimensions(),
        "embedding backend ready"
    );
    Ok(backend)
}

/// Build the backend named by `embedding.active_backend`.
pub fn create_active_backend(config: &SiftConfig) -> Result<Arc<dyn IEmbeddingBackend>, EmbeddingError> {
    let kind = config
        .active_backend()
        .map_err(|e| EmbeddingError::InvalidConfig {
            backend: config.embedding.active_backend.clone(),
            reason: e.to_string(),
        })?;
    create_backend(&config.embedding, kind)
}
