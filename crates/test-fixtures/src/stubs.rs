//! Stub embedding backends with scripted behavior.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sift_core::errors::EmbeddingError;
use sift_core::models::{BackendKind, ClaimedJob, JobPayload, ModelIdentity};
use sift_core::traits::IEmbeddingBackend;
use sift_core::vector;
use sift_embeddings::{estimate_tokens, ManualClock, RateGate};

/// Deterministic hashed bag-of-words vector, L2-normalized.
///
/// Texts sharing words get positive cosine similarity, which is enough for
/// retrieval tests to rank sensibly without a model.
pub fn bag_of_words(text: &str, dims: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dims.max(1)];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let token = token.to_lowercase();
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        let slot = (hash % v.len() as u64) as usize;
        v[slot] += 1.0;
    }
    vector::normalize(&mut v);
    v
}

/// Always succeeds. Records every document id it embedded.
pub struct StubBackend {
    identity: ModelIdentity,
    dims: usize,
    calls: AtomicUsize,
    embedded: Mutex<Vec<i64>>,
}

impl StubBackend {
    pub fn new(dims: usize) -> Self {
        Self::with_identity(
            ModelIdentity::with_dimensions(BackendKind::OpenAi, "stub-model", dims),
            dims,
        )
    }

    pub fn with_identity(identity: ModelIdentity, dims: usize) -> Self {
        Self {
            identity,
            dims,
            calls: AtomicUsize::new(0),
            embedded: Mutex::new(Vec::new()),
        }
    }

    /// Number of `embed` calls, successful or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Document ids in the order they were embedded. Duplicates are kept.
    pub fn embedded_ids(&self) -> Vec<i64> {
        self.embedded.lock().map(|ids| ids.clone()).unwrap_or_default()
    }

    fn vectors(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| bag_of_words(t, self.dims)).collect()
    }

    fn note_jobs(&self, jobs: &[ClaimedJob]) {
        if let Ok(mut ids) = self.embedded.lock() {
            ids.extend(jobs.iter().map(ClaimedJob::document_id));
        }
    }
}

impl IEmbeddingBackend for StubBackend {
    fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectors(texts))
    }

    fn embed_jobs(&self, jobs: &[ClaimedJob]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let texts: Vec<String> = jobs.iter().map(|j| j.text.clone()).collect();
        let vectors = self.embed(&texts)?;
        self.note_jobs(jobs);
        Ok(vectors)
    }
}

/// Fails with a transient error for the first `failures` calls.
pub struct FlakyBackend {
    inner: StubBackend,
    failures_left: AtomicU32,
}

impl FlakyBackend {
    pub fn new(dims: usize, failures: u32) -> Self {
        Self {
            inner: StubBackend::new(dims),
            failures_left: AtomicU32::new(failures),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

impl IEmbeddingBackend for FlakyBackend {
    fn identity(&self) -> &ModelIdentity {
        self.inner.identity()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            self.inner.calls.fetch_add(1, Ordering::SeqCst);
            return Err(EmbeddingError::RequestFailed {
                provider: "stub".to_string(),
                reason: "connection reset".to_string(),
            });
        }
        self.inner.embed(texts)
    }
}

/// Returns one vector fewer than it was given.
pub struct ShortBackend {
    inner: StubBackend,
}

impl ShortBackend {
    pub fn new(dims: usize) -> Self {
        Self {
            inner: StubBackend::new(dims),
        }
    }
}

impl IEmbeddingBackend for ShortBackend {
    fn identity(&self) -> &ModelIdentity {
        self.inner.identity()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = self.inner.embed(texts)?;
        vectors.pop();
        Ok(vectors)
    }
}

/// Always rejected with HTTP 401.
pub struct AuthFailBackend {
    inner: StubBackend,
}

impl AuthFailBackend {
    pub fn new(dims: usize) -> Self {
        Self {
            inner: StubBackend::new(dims),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

impl IEmbeddingBackend for AuthFailBackend {
    fn identity(&self) -> &ModelIdentity {
        self.inner.identity()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        Err(EmbeddingError::HttpStatus {
            provider: "stub".to_string(),
            status: 401,
            body: "invalid api key".to_string(),
        })
    }
}

/// Sleeps on every call. Gives cancellation tests a window to act in.
pub struct SlowBackend {
    inner: StubBackend,
    delay: Duration,
}

impl SlowBackend {
    pub fn new(dims: usize, delay: Duration) -> Self {
        Self {
            inner: StubBackend::new(dims),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

impl IEmbeddingBackend for SlowBackend {
    fn identity(&self) -> &ModelIdentity {
        self.inner.identity()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        std::thread::sleep(self.delay);
        self.inner.embed(texts)
    }
}

/// Panics on the first `panics` calls, then behaves like the stub.
pub struct PanicBackend {
    inner: StubBackend,
    panics_left: AtomicU32,
}

impl PanicBackend {
    pub fn new(dims: usize, panics: u32) -> Self {
        Self {
            inner: StubBackend::new(dims),
            panics_left: AtomicU32::new(panics),
        }
    }
}

impl IEmbeddingBackend for PanicBackend {
    fn identity(&self) -> &ModelIdentity {
        self.inner.identity()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let panicking = self
            .panics_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if panicking {
            panic!("stub backend panicked");
        }
        self.inner.embed(texts)
    }
}

/// Per-item backend behind a shared `RateGate` on a manual clock.
///
/// Records the clock offset at which each item was admitted.
pub struct GatedBackend {
    inner: StubBackend,
    gate: Arc<RateGate>,
    clock: Arc<ManualClock>,
    chars_per_token: usize,
    admissions: Mutex<Vec<Duration>>,
}

impl GatedBackend {
    pub fn new(dims: usize, max_rpm: u32, max_tpm: u32, clock: Arc<ManualClock>) -> Self {
        let gate = RateGate::with_clock(max_rpm, max_tpm, Duration::from_secs(60), clock.clone());
        Self {
            inner: StubBackend::with_identity(
                ModelIdentity::with_dimensions(BackendKind::Gemini, "stub-gated", dims),
                dims,
            ),
            gate: Arc::new(gate),
            clock,
            chars_per_token: 4,
            admissions: Mutex::new(Vec::new()),
        }
    }

    /// Admission offsets from the clock origin, in admission order.
    pub fn admissions(&self) -> Vec<Duration> {
        let mut out = self.admissions.lock().map(|a| a.clone()).unwrap_or_default();
        out.sort();
        out
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }
}

impl IEmbeddingBackend for GatedBackend {
    fn identity(&self) -> &ModelIdentity {
        self.inner.identity()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let admission = self.gate.acquire(estimate_tokens(text, self.chars_per_token));
            if let Ok(mut log) = self.admissions.lock() {
                log.push(admission.at.duration_since(self.clock.origin()));
            }
            out.extend(self.inner.embed(std::slice::from_ref(text))?);
        }
        Ok(out)
    }

    fn payload_for(&self, text: &str) -> JobPayload {
        JobPayload::RateLimited {
            estimated_tokens: estimate_tokens(text, self.chars_per_token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bag_of_words_is_unit_length_and_deterministic() {
        let a = bag_of_words("blood pressure", 32);
        let b = bag_of_words("Blood  pressure", 32);
        assert_eq!(a, b);
        assert!((vector::l2_norm(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_words_are_more_similar() {
        let q = bag_of_words("heart failure", 64);
        let near = bag_of_words("congestive heart failure", 64);
        let far = bag_of_words("airway inflammation", 64);
        assert!(vector::cosine_similarity(&q, &near) > vector::cosine_similarity(&q, &far));
    }

    #[test]
    fn flaky_fails_then_recovers() {
        let backend = FlakyBackend::new(8, 2);
        let texts = vec!["a".to_string()];
        assert!(backend.embed(&texts).is_err());
        assert!(backend.embed(&texts).is_err());
        assert!(backend.embed(&texts).is_ok());
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn short_backend_drops_one_vector() {
        let backend = ShortBackend::new(8);
        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(backend.embed(&texts).unwrap().len(), 1);
    }

    #[test]
    fn auth_failure_is_configuration() {
        let backend = AuthFailBackend::new(8);
        let err = backend.embed(&["a".to_string()]).unwrap_err();
        assert!(err.is_configuration());
    }
}
