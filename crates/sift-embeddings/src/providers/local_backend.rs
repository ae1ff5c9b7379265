//! Local ONNX inference backend.

use std::path::PathBuf;
use std::sync::Arc;

use sift_core::config::LocalConfig;
use sift_core::errors::EmbeddingError;
use sift_core::models::{JobPayload, ModelIdentity, Precision};
use sift_core::traits::IEmbeddingBackend;

use crate::local::{onnx_model, LocalModel, LocalModelContext, OnnxModel};
use crate::matryoshka;

const PROVIDER: &str = "local";

pub struct LocalBackend {
    identity: ModelIdentity,
    dimensions: usize,
    precision: Precision,
    context: Arc<LocalModelContext>,
}

impl LocalBackend {
    /// Validate the model directory now; load the model on first batch.
    pub fn new(config: &LocalConfig) -> Result<Self, EmbeddingError> {
        let precision = Precision::parse(&config.precision).ok_or_else(|| {
            EmbeddingError::InvalidConfig {
                backend: PROVIDER.to_string(),
                reason: format!("unknown precision '{}'", config.precision),
            }
        })?;
        if config.dimensions == 0 {
            return Err(EmbeddingError::InvalidConfig {
                backend: PROVIDER.to_string(),
                reason: "dimensions must be positive".to_string(),
            });
        }
        let dir = config
            .model_dir
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| EmbeddingError::InvalidConfig {
                backend: PROVIDER.to_string(),
                reason: "model_dir is not set".to_string(),
            })?;
        if onnx_model::model_file(&dir, precision).is_none() {
            return Err(EmbeddingError::ModelLoadFailed {
                path: dir.join(precision.model_file()).display().to_string(),
                reason: "model file not found".to_string(),
            });
        }

        let max_length = config.max_length;
        let intra_threads = config.intra_threads;
        let dimensions = config.dimensions;
        let context = LocalModelContext::new(Box::new(move || {
            OnnxModel::load(&dir, precision, max_length, intra_threads, dimensions)
                .map(|m| Arc::new(m) as Arc<dyn LocalModel>)
        }));
        Ok(Self::with_context(
            config.model.clone(),
            precision,
            config.dimensions,
            Arc::new(context),
        ))
    }

    /// Build around an existing context (tests inject their own loader).
    pub fn with_context(
        model: impl Into<String>,
        precision: Precision,
        dimensions: usize,
        context: Arc<LocalModelContext>,
    ) -> Self {
        Self {
            identity: ModelIdentity::local(model, precision, dimensions),
            dimensions,
            precision,
            context,
        }
    }

    pub fn context(&self) -> &Arc<LocalModelContext> {
        &self.context
    }
}

impl IEmbeddingBackend for LocalBackend {
    fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.context.get()?;
        let vectors = model.embed_batch(texts)?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::BatchLengthMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            });
        }
        vectors
            .into_iter()
            .map(|v| matryoshka::fit_to(v, self.dimensions))
            .collect()
    }

    fn payload_for(&self, _text: &str) -> JobPayload {
        JobPayload::Local {
            precision: self.precision,
        }
    }
}
