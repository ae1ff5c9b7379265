//! Rate-limited backend: request shape and the shared window ceiling.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use sift_core::config::GeminiConfig;
use sift_core::models::JobPayload;
use sift_core::traits::IEmbeddingBackend;
use sift_embeddings::providers::RetryPolicy;
use sift_embeddings::{GeminiBackend, ManualClock, RateGate};

struct MockState {
    clock: Arc<ManualClock>,
    /// Virtual time at which each request arrived.
    arrivals: Mutex<Vec<Duration>>,
}

async fn handler(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if uri.path() != "/v1beta/models/gemini-embedding-001:embedContent" {
        return (StatusCode::NOT_FOUND, "no such model").into_response();
    }
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("g-key") {
        return (StatusCode::FORBIDDEN, "bad key").into_response();
    }
    state
        .arrivals
        .lock()
        .unwrap()
        .push(state.clock.elapsed());
    let dims = body["outputDimensionality"].as_u64().unwrap_or(0) as usize;
    let text = body["content"]["parts"][0]["text"].as_str().unwrap_or("");
    let mut values = vec![0.0f32; dims];
    if dims > 0 {
        values[0] = text.len() as f32;
    }
    Json(json!({ "embedding": { "values": values } })).into_response()
}

fn config(base_url: &str, rpm: u32) -> GeminiConfig {
    GeminiConfig {
        api_key: Some("g-key".into()),
        base_url: format!("{base_url}/v1beta"),
        model: "gemini-embedding-001".into(),
        dimensions: 4,
        max_rpm: rpm,
        max_tpm: 1_000_000,
        window_secs: 60,
        chars_per_token: 4,
        timeout_secs: 5,
        max_retries: 0,
    }
}

fn setup(rpm: u32) -> Option<(common::MockServer, GeminiBackend, Arc<MockState>)> {
    let clock = Arc::new(ManualClock::new());
    let state = Arc::new(MockState {
        clock: clock.clone(),
        arrivals: Mutex::new(Vec::new()),
    });
    let server = common::spawn(Router::new().fallback(handler).with_state(state.clone()))?;
    let gate = Arc::new(RateGate::with_clock(
        rpm,
        1_000_000,
        Duration::from_secs(60),
        clock,
    ));
    let backend = GeminiBackend::with_gate(&config(&server.base_url, rpm), gate)
        .unwrap()
        .with_retry_policy(RetryPolicy::none());
    Some((server, backend, state))
}

fn max_in_any_window(arrivals: &[Duration], window: Duration) -> usize {
    arrivals
        .iter()
        .map(|start| {
            arrivals
                .iter()
                .filter(|t| **t >= *start && **t - *start < window)
                .count()
        })
        .max()
        .unwrap_or(0)
}

#[test]
fn one_request_per_item_with_expected_shape() {
    let Some((_server, backend, state)) = setup(100) else { return };
    let texts = vec!["alpha".to_string(), "be".to_string()];
    let out = backend.embed(&texts).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(state.arrivals.lock().unwrap().len(), 2);
    // Vectors come back renormalized only when truncated; here dims match.
    assert_eq!(out[0][0], 5.0);
    assert_eq!(out[1][0], 2.0);
}

#[test]
fn six_single_item_calls_at_three_rpm_never_exceed_ceiling() {
    let Some((_server, backend, state)) = setup(3) else { return };
    for i in 0..6 {
        let out = backend.embed(&[format!("job {i}")]).unwrap();
        assert_eq!(out.len(), 1);
    }

    let arrivals = state.arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 6);
    assert!(max_in_any_window(&arrivals, Duration::from_secs(60)) <= 3);
    // Second group had to wait out the first window.
    assert!(arrivals[3] >= Duration::from_secs(60));
}

#[test]
fn payload_carries_token_estimate() {
    let Some((_server, backend, _)) = setup(10) else { return };
    assert_eq!(
        backend.payload_for("abcdefghi"),
        JobPayload::RateLimited { estimated_tokens: 3 }
    );
}

#[test]
fn missing_key_is_configuration_error() {
    let mut cfg = config("http://127.0.0.1:9", 3);
    cfg.api_key = None;
    let err = GeminiBackend::new(&cfg).err().unwrap();
    assert!(err.is_configuration());
}
