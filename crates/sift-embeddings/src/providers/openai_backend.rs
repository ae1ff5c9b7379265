//! Batched OpenAI-compatible `/embeddings` backend.
//!
//! One POST per batch. The response is reordered by `index` and must hold
//! exactly one vector per input, with indices `0..n`.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sift_core::config::OpenAiConfig;
use sift_core::errors::EmbeddingError;
use sift_core::models::{BackendKind, ModelIdentity};
use sift_core::traits::IEmbeddingBackend;
use tracing::debug;

use super::http::{self, RetryPolicy};
use crate::matryoshka;

const PROVIDER: &str = "openai";

pub struct OpenAiBackend {
    client: Client,
    endpoint: String,
    identity: ModelIdentity,
    dimensions: usize,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiBackend {
    pub fn new(config: &OpenAiConfig) -> Result<Self, EmbeddingError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EmbeddingError::MissingCredential {
                backend: PROVIDER.to_string(),
            })?;
        if config.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                backend: PROVIDER.to_string(),
                reason: "model name is empty".to_string(),
            });
        }
        if config.dimensions == 0 {
            return Err(EmbeddingError::InvalidConfig {
                backend: PROVIDER.to_string(),
                reason: "dimensions must be positive".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
            EmbeddingError::InvalidConfig {
                backend: PROVIDER.to_string(),
                reason: format!("invalid API key: {e}"),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = http::build_client(PROVIDER, headers, config.timeout_secs)?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            identity: ModelIdentity::with_dimensions(
                BackendKind::OpenAi,
                config.model.clone(),
                config.dimensions,
            ),
            dimensions: config.dimensions,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbeddingRequest {
            model: &self.identity.model,
            input: texts,
            dimensions: self.dimensions,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| http::transport_error(PROVIDER, e))?;
        let response = http::check_status(PROVIDER, response)?;
        let mut parsed: EmbeddingResponse = http::parse_json(PROVIDER, response)?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::BatchLengthMismatch {
                expected: texts.len(),
                actual: parsed.data.len(),
            });
        }
        parsed.data.sort_by_key(|entry| entry.index);
        if let Some((position, entry)) = parsed
            .data
            .iter()
            .enumerate()
            .find(|(position, entry)| entry.index != *position)
        {
            return Err(EmbeddingError::MalformedResponse {
                provider: PROVIDER.to_string(),
                reason: format!(
                    "response indices are not 0..{}: found index {} at position {position}",
                    texts.len(),
                    entry.index
                ),
            });
        }
        parsed
            .data
            .into_iter()
            .map(|entry| matryoshka::fit_to(entry.embedding, self.dimensions))
            .collect()
    }
}

impl IEmbeddingBackend for OpenAiBackend {
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
        debug!(batch = texts.len(), model = %self.identity.model, "openai embed");
        http::with_retry(PROVIDER, &self.retry, || self.request(texts))
    }
}
