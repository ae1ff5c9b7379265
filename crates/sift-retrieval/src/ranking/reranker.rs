//! Optional external re-ranking of the shortlist.
//!
//! The reranker receives `{query, documents}` and answers `{scores}` with one
//! score per document. Any failure keeps the order the engine already had.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use sift_core::errors::{RetrievalError, SiftResult};
use sift_core::models::SearchHit;
use sift_core::traits::IReranker;
use tracing::{debug, warn};

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    scores: Vec<f64>,
}

/// Reranker behind an HTTP endpoint.
pub struct HttpReranker {
    client: Client,
    endpoint: String,
}

impl HttpReranker {
    pub fn new(endpoint: &str, timeout: Duration) -> SiftResult<Self> {
        let client = Client::builder()
            .timeout(timeout.max(Duration::from_millis(1)))
            .build()
            .map_err(|e| RetrievalError::RerankFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl IReranker for HttpReranker {
    fn rerank(&self, query: &str, documents: &[String]) -> SiftResult<Vec<f64>> {
        let failed = |reason: String| RetrievalError::RerankFailed { reason };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RerankRequest { query, documents })
            .send()
            .map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status.as_u16())).into());
        }
        let body: RerankResponse = response.json().map_err(|e| failed(e.to_string()))?;
        Ok(body.scores)
    }
}

/// Re-score the first `top_k` hits with `reranker` and reorder them by the
/// new score. Hits past `top_k` keep their place after the shortlist.
///
/// Returns `Err` with the hits untouched when the reranker fails, answers
/// with the wrong number of scores, or returns a non-finite score.
pub fn apply_rerank(
    reranker: &dyn IReranker,
    query: &str,
    mut hits: Vec<SearchHit>,
    texts: &[String],
    top_k: usize,
) -> Result<Vec<SearchHit>, (Vec<SearchHit>, RetrievalError)> {
    let k = top_k.min(hits.len()).min(texts.len());
    if k == 0 {
        return Ok(hits);
    }

    let scores = match reranker.rerank(query, &texts[..k]) {
        Ok(scores) => scores,
        Err(e) => {
            let reason = e.to_string();
            return Err((hits, RetrievalError::RerankFailed { reason }));
        }
    };
    if scores.len() != k {
        let reason = format!("expected {k} scores, got {}", scores.len());
        return Err((hits, RetrievalError::RerankFailed { reason }));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        let reason = "non-finite score".to_string();
        return Err((hits, RetrievalError::RerankFailed { reason }));
    }

    for (hit, score) in hits.iter_mut().zip(scores) {
        hit.rerank_score = Some(score);
    }
    // Stable: equal rerank scores keep the pre-rerank order.
    hits[..k].sort_by(|a, b| {
        b.rerank_score
            .partial_cmp(&a.rerank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    debug!(reranked = k, "shortlist reranked");
    Ok(hits)
}

/// [`apply_rerank`], logging and swallowing failures.
pub fn rerank_or_keep(
    reranker: &dyn IReranker,
    query: &str,
    hits: Vec<SearchHit>,
    texts: &[String],
    top_k: usize,
) -> (Vec<SearchHit>, Option<RetrievalError>) {
    match apply_rerank(reranker, query, hits, texts, top_k) {
        Ok(hits) => (hits, None),
        Err((hits, err)) => {
            warn!(error = %err, "rerank failed, keeping fused order");
            (hits, Some(err))
        }
    }
}
