//! Configuration loaded from TOML, then overridden from the environment.

pub mod defaults;
mod embedding_config;
mod observability_config;
mod pipeline_config;
mod retrieval_config;
mod storage_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use embedding_config::{EmbeddingConfig, GeminiConfig, LocalConfig, OpenAiConfig};
pub use observability_config::ObservabilityConfig;
pub use pipeline_config::PipelineConfig;
pub use retrieval_config::RetrievalConfig;
pub use storage_config::StorageConfig;

use crate::errors::ConfigError;
use crate::models::{BackendKind, Precision};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub pipeline: PipelineConfig,
    pub retrieval: RetrievalConfig,
    pub observability: ObservabilityConfig,
}

impl SiftConfig {
    /// Parse from a TOML string. Missing sections and fields take defaults.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Read a TOML file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Apply overrides from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable numbers are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SIFT_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Some(v) = lookup("SIFT_BACKEND") {
            self.embedding.active_backend = v.trim().to_lowercase();
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.embedding.openai.api_key = Some(v);
        }
        if let Some(v) = lookup("SIFT_OPENAI_MODEL") {
            self.embedding.openai.model = v;
        }
        if let Some(v) = parse_env(&lookup, "SIFT_OPENAI_DIMENSIONS") {
            self.embedding.openai.dimensions = v;
        }
        if let Some(v) = lookup("GEMINI_API_KEY") {
            self.embedding.gemini.api_key = Some(v);
        }
        if let Some(v) = lookup("SIFT_GEMINI_MODEL") {
            self.embedding.gemini.model = v;
        }
        if let Some(v) = parse_env(&lookup, "SIFT_GEMINI_DIMENSIONS") {
            self.embedding.gemini.dimensions = v;
        }
        if let Some(v) = parse_env(&lookup, "SIFT_GEMINI_MAX_RPM") {
            self.embedding.gemini.max_rpm = v;
        }
        if let Some(v) = parse_env(&lookup, "SIFT_GEMINI_MAX_TPM") {
            self.embedding.gemini.max_tpm = v;
        }
        if let Some(v) = lookup("SIFT_LOCAL_MODEL_DIR") {
            self.embedding.local.model_dir = Some(v);
        }
        if let Some(v) = lookup("SIFT_LOCAL_PRECISION") {
            self.embedding.local.precision = v.trim().to_lowercase();
        }
        if let Some(v) = parse_env(&lookup, "SIFT_CONCURRENCY") {
            self.pipeline.concurrency = v;
        }
        if let Some(v) = parse_env(&lookup, "SIFT_BATCH_SIZE") {
            self.pipeline.batch_size = v;
        }
        if let Some(v) = lookup("SIFT_REBUILD_ALL") {
            self.pipeline.rebuild_all = matches!(v.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = lookup("SIFT_RERANK_ENDPOINT") {
            self.retrieval.rerank_endpoint = Some(v).filter(|s| !s.trim().is_empty());
        }
    }

    /// Reject values that would make a run or query meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.active_backend()?;
        Precision::parse(&self.embedding.local.precision).ok_or_else(|| invalid(
            "embedding.local.precision",
            format!("unknown precision '{}'", self.embedding.local.precision),
        ))?;
        positive("embedding.openai.dimensions", self.embedding.openai.dimensions)?;
        positive("embedding.gemini.dimensions", self.embedding.gemini.dimensions)?;
        positive("embedding.local.dimensions", self.embedding.local.dimensions)?;
        positive("embedding.gemini.max_rpm", self.embedding.gemini.max_rpm as usize)?;
        positive("embedding.gemini.max_tpm", self.embedding.gemini.max_tpm as usize)?;
        positive("embedding.gemini.window_secs", self.embedding.gemini.window_secs as usize)?;
        positive(
            "embedding.gemini.chars_per_token",
            self.embedding.gemini.chars_per_token,
        )?;
        positive("pipeline.concurrency", self.pipeline.concurrency)?;
        positive("pipeline.batch_size", self.pipeline.batch_size)?;
        positive("retrieval.candidate_pool", self.retrieval.candidate_pool)?;
        if !self.retrieval.hybrid_alpha.is_finite() || self.retrieval.hybrid_alpha < 0.0 {
            return Err(invalid(
                "retrieval.hybrid_alpha",
                "must be a finite, non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured backend selector, parsed.
    pub fn active_backend(&self) -> Result<BackendKind, ConfigError> {
        BackendKind::parse(&self.embedding.active_backend).ok_or_else(|| {
            invalid(
                "embedding.active_backend",
                format!("unknown backend '{}'", self.embedding.active_backend),
            )
        })
    }
}

fn parse_env<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn positive(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than zero".to_string()));
    }
    Ok(())
}

fn invalid(field: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason,
    }
}
