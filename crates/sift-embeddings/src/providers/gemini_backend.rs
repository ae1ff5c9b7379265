//! Rate-limited per-item backend (Gemini `embedContent`).
//!
//! One POST per text. Every call, retries included, passes through the
//! shared `RateGate` first.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sift_core::config::GeminiConfig;
use sift_core::errors::EmbeddingError;
use sift_core::models::{BackendKind, ClaimedJob, JobPayload, ModelIdentity};
use sift_core::traits::IEmbeddingBackend;

use super::http::{self, RetryPolicy};
use crate::matryoshka;
use crate::rate_gate::{estimate_tokens, RateGate};

const PROVIDER: &str = "gemini";

pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    model_path: String,
    identity: ModelIdentity,
    dimensions: usize,
    chars_per_token: usize,
    gate: Arc<RateGate>,
    retry: RetryPolicy,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiBackend {
    /// Build the backend with its own gate sized from the config.
    pub fn new(config: &GeminiConfig) -> Result<Self, EmbeddingError> {
        let gate = Arc::new(RateGate::new(
            config.max_rpm,
            config.max_tpm,
            Duration::from_secs(config.window_secs.max(1)),
        ));
        Self::with_gate(config, gate)
    }

    /// Build the backend around an existing gate.
    pub fn with_gate(config: &GeminiConfig, gate: Arc<RateGate>) -> Result<Self, EmbeddingError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EmbeddingError::MissingCredential {
                backend: PROVIDER.to_string(),
            })?;
        if config.dimensions == 0 {
            return Err(EmbeddingError::InvalidConfig {
                backend: PROVIDER.to_string(),
                reason: "dimensions must be positive".to_string(),
            });
        }
        if config.max_rpm == 0 || config.max_tpm == 0 {
            return Err(EmbeddingError::InvalidConfig {
                backend: PROVIDER.to_string(),
                reason: "rate ceilings must be positive".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key).map_err(|e| EmbeddingError::InvalidConfig {
            backend: PROVIDER.to_string(),
            reason: format!("invalid API key: {e}"),
        })?;
        headers.insert("x-goog-api-key", key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = http::build_client(PROVIDER, headers, config.timeout_secs)?;

        let model = config.model.trim().trim_start_matches("models/");
        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:embedContent",
                config.base_url.trim_end_matches('/'),
                model
            ),
            model_path: format!("models/{model}"),
            identity: ModelIdentity::with_dimensions(BackendKind::Gemini, model, config.dimensions),
            dimensions: config.dimensions,
            chars_per_token: config.chars_per_token,
            gate,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }

    fn embed_one(&self, text: &str, tokens: u32) -> Result<Vec<f32>, EmbeddingError> {
        http::with_retry(PROVIDER, &self.retry, || {
            self.gate.acquire(tokens);
            let body = EmbedContentRequest {
                model: &self.model_path,
                content: Content {
                    parts: [Part { text }],
                },
                output_dimensionality: self.dimensions,
            };
            let response = self
                .client
                .post(&self.endpoint)
                .json(&body)
                .send()
                .map_err(|e| http::transport_error(PROVIDER, e))?;
            let response = http::check_status(PROVIDER, response)?;
            let parsed: EmbedContentResponse = http::parse_json(PROVIDER, response)?;
            matryoshka::fit_to(parsed.embedding.values, self.dimensions)
        })
    }
}

impl IEmbeddingBackend for GeminiBackend {
    fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts
            .iter()
            .map(|text| self.embed_one(text, estimate_tokens(text, self.chars_per_token)))
            .collect()
    }

    fn embed_jobs(&self, jobs: &[ClaimedJob]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        jobs.iter()
            .map(|job| {
                let tokens = match job.payload {
                    JobPayload::RateLimited { estimated_tokens } => estimated_tokens,
                    _ => estimate_tokens(&job.text, self.chars_per_token),
                };
                self.embed_one(&job.text, tokens)
            })
            .collect()
    }

    fn payload_for(&self, text: &str) -> JobPayload {
        JobPayload::RateLimited {
            estimated_tokens: estimate_tokens(text, self.chars_per_token),
        }
    }
}
