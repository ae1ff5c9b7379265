//! Shared HTTP plumbing for the cloud backends: client construction, status
//! classification, and retry with exponential backoff.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use sift_core::errors::EmbeddingError;
use tracing::{debug, warn};

/// Longest error body kept in an `HttpStatus` error.
const MAX_ERROR_BODY: usize = 512;

/// Retry budget for transient HTTP failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(500),
        }
    }

    /// No retries; the worker's requeue handles the failure.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << attempt.min(5))
    }
}

pub fn build_client(
    provider: &str,
    headers: HeaderMap,
    timeout_secs: u64,
) -> Result<Client, EmbeddingError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .default_headers(headers)
        .build()
        .map_err(|e| EmbeddingError::InvalidConfig {
            backend: provider.to_string(),
            reason: format!("failed to build HTTP client: {e}"),
        })
}

/// Map a transport failure (connect, timeout, body) to a transient error.
pub fn transport_error(provider: &str, err: reqwest::Error) -> EmbeddingError {
    EmbeddingError::RequestFailed {
        provider: provider.to_string(),
        reason: err.to_string(),
    }
}

/// Pass successful responses through; turn anything else into `HttpStatus`.
pub fn check_status(provider: &str, response: Response) -> Result<Response, EmbeddingError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(EmbeddingError::HttpStatus {
        provider: provider.to_string(),
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY).collect(),
    })
}

/// Decode a JSON body; shape problems are contract violations.
pub fn parse_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T, EmbeddingError> {
    response
        .json::<T>()
        .map_err(|e| EmbeddingError::MalformedResponse {
            provider: provider.to_string(),
            reason: e.to_string(),
        })
}

/// Whether an error is worth retrying inside the adapter.
///
/// Only transport failures, 429, and 5xx qualify; other statuses go straight
/// back to the worker.
pub fn is_retryable(err: &EmbeddingError) -> bool {
    match err {
        EmbeddingError::RequestFailed { .. } => true,
        EmbeddingError::HttpStatus { status, .. } => StatusCode::from_u16(*status)
            .map(|s| s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error())
            .unwrap_or(false),
        _ => false,
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent.
pub fn with_retry<T>(
    provider: &str,
    policy: &RetryPolicy,
    mut op: impl FnMut() -> Result<T, EmbeddingError>,
) -> Result<T, EmbeddingError> {
    let mut attempt = 0u32;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay(attempt);
                warn!(provider, attempt, error = %err, "embedding request failed, retrying");
                debug!(delay_ms = delay.as_millis() as u64, "backoff");
                std::thread::sleep(delay);
            }
            Err(err) => return Err(err),
        }
    }
}
