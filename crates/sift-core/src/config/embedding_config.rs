use serde::{Deserialize, Serialize};

use super::defaults;

/// Embedding backend configuration. Only the active backend's table is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Active backend: "openai", "gemini", or "local".
    pub active_backend: String,
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
    pub local: LocalConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            active_backend: defaults::DEFAULT_ACTIVE_BACKEND.to_string(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            local: LocalConfig::default(),
        }
    }
}

/// Batched OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::DEFAULT_OPENAI_BASE_URL.to_string(),
            model: defaults::DEFAULT_OPENAI_MODEL.to_string(),
            dimensions: defaults::DEFAULT_OPENAI_DIMENSIONS,
            timeout_secs: defaults::DEFAULT_HTTP_TIMEOUT_SECS,
            max_retries: defaults::DEFAULT_HTTP_MAX_RETRIES,
        }
    }
}

/// Rate-limited per-item endpoint (Gemini `embedContent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    /// Requests allowed per rate window.
    pub max_rpm: u32,
    /// Estimated tokens allowed per rate window.
    pub max_tpm: u32,
    pub window_secs: u64,
    /// Characters per estimated token.
    pub chars_per_token: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::DEFAULT_GEMINI_BASE_URL.to_string(),
            model: defaults::DEFAULT_GEMINI_MODEL.to_string(),
            dimensions: defaults::DEFAULT_GEMINI_DIMENSIONS,
            max_rpm: defaults::DEFAULT_GEMINI_MAX_RPM,
            max_tpm: defaults::DEFAULT_GEMINI_MAX_TPM,
            window_secs: defaults::DEFAULT_RATE_WINDOW_SECS,
            chars_per_token: defaults::DEFAULT_CHARS_PER_TOKEN,
            timeout_secs: defaults::DEFAULT_HTTP_TIMEOUT_SECS,
            max_retries: defaults::DEFAULT_HTTP_MAX_RETRIES,
        }
    }
}

/// Local ONNX inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory holding `tokenizer.json` and the model variants.
    pub model_dir: Option<String>,
    pub model: String,
    /// "f32", "f16", or "int8".
    pub precision: String,
    pub dimensions: usize,
    /// Tokenizer truncation length.
    pub max_length: usize,
    pub intra_threads: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            model: defaults::DEFAULT_LOCAL_MODEL.to_string(),
            precision: defaults::DEFAULT_LOCAL_PRECISION.to_string(),
            dimensions: defaults::DEFAULT_LOCAL_DIMENSIONS,
            max_length: defaults::DEFAULT_LOCAL_MAX_LENGTH,
            intra_threads: defaults::DEFAULT_LOCAL_INTRA_THREADS,
        }
    }
}
