//! RetrievalEngine: lexical, vector, and hybrid search over one corpus and
//! one embedding identity, plus similar-to lookups and the ANN rebuild.
//!
//! Degraded modes stay inside the engine. A failing path falls back to the
//! other one and is recorded as a degradation; only when both fail does a
//! query return `NoSearchPath`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use moka::sync::Cache;
use sift_core::config::RetrievalConfig;
use sift_core::errors::{RetrievalError, SiftError, SiftResult};
use sift_core::models::{
    DegradationEvent, IndexStatus, LexicalHit, ModelIdentity, SearchHit, SearchMode, StoredVector,
};
use sift_core::normalize_text;
use sift_core::traits::{ICorpusStore, IEmbeddingBackend, IReranker};
use sift_core::ContentHash;
use sift_observability::tracing_setup::events;
use sift_observability::{index_span, retrieval_span};
use sift_observability::{DegradationTracker, RetrievalMetrics, TrackedDegradation};
use sift_storage::EmbeddingStore;
use tracing::{debug, info};

use crate::index::{AnnIndex, AnnParams};
use crate::ranking::{rerank_or_keep, HttpReranker};
use crate::search::hybrid::{lexical_strengths, modulate};
use crate::search::{lexical, vector, QueryVector};

const LEXICAL: &str = "lexical";
const VECTOR: &str = "vector";
const ANN_INDEX: &str = "ann_index";
const RERANK: &str = "rerank";

pub struct RetrievalEngine {
    store: Arc<EmbeddingStore>,
    corpus: Arc<dyn ICorpusStore>,
    embedder: Option<Arc<dyn IEmbeddingBackend>>,
    identity: Option<ModelIdentity>,
    reranker: Option<Arc<dyn IReranker>>,
    config: RetrievalConfig,
    query_cache: Cache<String, Arc<Vec<f32>>>,
    index: RwLock<Option<Arc<AnnIndex>>>,
    degradation: Mutex<DegradationTracker>,
    metrics: Mutex<RetrievalMetrics>,
}

impl RetrievalEngine {
    /// Engine without a query embedder. Lexical search works right away;
    /// vector and hybrid search need [`with_embedder`](Self::with_embedder).
    ///
    /// A configured `rerank_endpoint` enables the HTTP reranker.
    pub fn new(
        store: Arc<EmbeddingStore>,
        corpus: Arc<dyn ICorpusStore>,
        config: RetrievalConfig,
    ) -> SiftResult<Self> {
        let reranker = match config.rerank_endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => {
                let timeout = Duration::from_millis(config.rerank_timeout_ms);
                let http = HttpReranker::new(endpoint, timeout)?;
                Some(Arc::new(http) as Arc<dyn IReranker>)
            }
            _ => None,
        };
        let query_cache = Cache::builder()
            .max_capacity(config.query_cache_size)
            .time_to_idle(Duration::from_secs(3600))
            .build();
        Ok(Self {
            store,
            corpus,
            embedder: None,
            identity: None,
            reranker,
            config,
            query_cache,
            index: RwLock::new(None),
            degradation: Mutex::new(DegradationTracker::new()),
            metrics: Mutex::new(RetrievalMetrics::new()),
        })
    }

    /// Embed queries with `backend` and search its stored vectors.
    pub fn with_embedder(mut self, backend: Arc<dyn IEmbeddingBackend>) -> Self {
        self.identity = Some(backend.identity().clone());
        self.embedder = Some(backend);
        self
    }

    /// Search the vectors of `identity` without a query embedder. Enough
    /// for `similar_to` and the index rebuild.
    pub fn with_identity(mut self, identity: ModelIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn IReranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn identity(&self) -> Option<&ModelIdentity> {
        self.identity.as_ref()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Ranked hits for `query`, at most `limit`. A query with no text after
    /// normalization returns no hits, as does a stopword-only lexical query.
    pub fn search(&self, query: &str, mode: SearchMode, limit: usize) -> SiftResult<Vec<SearchHit>> {
        let span = retrieval_span!(query, mode);
        let _guard = span.enter();
        let started = Instant::now();

        let query = query.trim();
        if limit == 0 || normalize_text(query).is_empty() {
            self.record_query(mode, false, started.elapsed());
            return Ok(Vec::new());
        }

        let hits = match mode {
            SearchMode::Lexical => self.lexical_mode(query),
            SearchMode::Vector => self.vector_mode(query),
            SearchMode::Hybrid => self.hybrid_mode(query),
        };
        let hits = match hits {
            Ok(hits) => hits,
            Err(e) => {
                self.record_query(mode, false, started.elapsed());
                return Err(e);
            }
        };

        let mut hits = self.rerank(query, hits);
        hits.truncate(limit);
        self.record_query(mode, !hits.is_empty(), started.elapsed());
        debug!(hits = hits.len(), "search complete");
        Ok(hits)
    }

    /// Documents nearest to the stored embedding of `document_id`, excluding
    /// the document itself. Empty when the document has no embedding.
    pub fn similar_to(&self, document_id: i64, limit: usize) -> SiftResult<Vec<SearchHit>> {
        let identity = self.require_identity()?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let Some(record) = self.store.get_record(identity, document_id)? else {
            debug!(document_id, "no embedding for similar-to seed");
            return Ok(Vec::new());
        };
        let nearest = self.nearest(identity, &record.vector, limit, Some(document_id))?;
        Ok(nearest.into_iter().map(|(id, sim)| vector_hit(id, sim)).collect())
    }

    /// Rebuild the ANN index from the store's current vectors. Queries keep
    /// using the previous index (or the scan) until the new one is in place.
    pub fn rebuild_accelerating_index(&self) -> SiftResult<IndexStatus> {
        let identity = self.require_identity()?.clone();
        let span = index_span!(identity.backend.as_str(), &identity.model);
        let _guard = span.enter();

        let fingerprint = self.store.fingerprint(&identity)?;
        let vectors = self.store.scan_vectors(&identity)?;
        let index = AnnIndex::build(
            identity.clone(),
            fingerprint,
            vectors,
            AnnParams::from_config(&self.config),
        )?;

        let status = IndexStatus {
            backend: identity.backend.as_str().to_string(),
            model: identity.model.clone(),
            documents: index.len(),
            dimension: index.dimension(),
            off_dimension: index.off_dimension(),
            skipped: index.skipped(),
            build_ms: index.build_ms(),
        };
        events::index_rebuilt(
            &status.backend,
            &status.model,
            status.documents,
            status.skipped,
            status.build_ms,
        );
        if status.off_dimension > 0 {
            debug!(
                off_dimension = status.off_dimension,
                dimension = status.dimension,
                "records of another dimension are scanned beside the index"
            );
        }

        *self.index.write().unwrap_or_else(|p| p.into_inner()) = Some(Arc::new(index));
        self.degradation
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .mark_recovered(ANN_INDEX);
        Ok(status)
    }

    /// Drop the ANN index; vector search goes back to the scan.
    pub fn clear_accelerating_index(&self) {
        *self.index.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    pub fn has_accelerating_index(&self) -> bool {
        self.index
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn metrics(&self) -> RetrievalMetrics {
        self.metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn degradations(&self) -> Vec<TrackedDegradation> {
        self.degradation
            .lock()
            .map(|t| t.events().to_vec())
            .unwrap_or_default()
    }

    pub fn clear_query_cache(&self) {
        self.query_cache.invalidate_all();
    }

    // --- Modes ---

    fn lexical_mode(&self, query: &str) -> SiftResult<Vec<SearchHit>> {
        match lexical::search(self.corpus.as_ref(), query, &self.config) {
            Ok(hits) => Ok(hits),
            Err(lexical_err) => {
                self.degrade(LEXICAL, &lexical_err.to_string(), VECTOR);
                match self.vector_hits(query) {
                    Ok(hits) => {
                        self.record_fallback();
                        Ok(hits)
                    }
                    Err(vector_err) => Err(no_search_path(&lexical_err, &vector_err)),
                }
            }
        }
    }

    fn vector_mode(&self, query: &str) -> SiftResult<Vec<SearchHit>> {
        match self.vector_hits(query) {
            Ok(hits) => Ok(hits),
            Err(vector_err) => {
                self.degrade(VECTOR, &vector_err.to_string(), LEXICAL);
                match lexical::search(self.corpus.as_ref(), query, &self.config) {
                    Ok(hits) => {
                        self.record_fallback();
                        Ok(hits)
                    }
                    Err(lexical_err) => Err(no_search_path(&lexical_err, &vector_err)),
                }
            }
        }
    }

    fn hybrid_mode(&self, query: &str) -> SiftResult<Vec<SearchHit>> {
        let lexical = lexical::candidates(self.corpus.as_ref(), query, &self.config);
        let semantic = self.semantic_candidates(query);

        match (lexical, semantic) {
            (Ok(lex), Ok((identity, q, nearest))) => self.fuse(&identity, &q, &lex, nearest),
            (Ok(lex), Err(vector_err)) => {
                self.degrade(VECTOR, &vector_err.to_string(), LEXICAL);
                self.record_fallback();
                lexical::rank(self.corpus.as_ref(), query, &lex, &self.config)
            }
            (Err(lexical_err), Ok((_, _, nearest))) => {
                // Without the lexical signal the cosine order stands as is.
                self.degrade(LEXICAL, &lexical_err.to_string(), VECTOR);
                self.record_fallback();
                Ok(nearest.into_iter().map(|(id, sim)| vector_hit(id, sim)).collect())
            }
            (Err(lexical_err), Err(vector_err)) => Err(no_search_path(&lexical_err, &vector_err)),
        }
    }

    /// Modulate every candidate's cosine by its lexical strength. Lexical
    /// hits outside the vector shortlist are scored from their stored
    /// vector; lexical hits with no vector score 0.
    fn fuse(
        &self,
        identity: &ModelIdentity,
        query: &[f32],
        lexical: &[LexicalHit],
        nearest: Vec<(i64, f64)>,
    ) -> SiftResult<Vec<SearchHit>> {
        let strengths = lexical_strengths(lexical);
        let bm25: HashMap<i64, f64> = lexical.iter().map(|h| (h.document_id, h.bm25)).collect();
        let mut similarity: HashMap<i64, f64> = nearest.iter().copied().collect();
        let mut order: Vec<i64> = nearest.iter().map(|(id, _)| *id).collect();

        let q = QueryVector::new(query);
        for hit in lexical {
            if similarity.contains_key(&hit.document_id) {
                continue;
            }
            order.push(hit.document_id);
            if let Some(record) = self.store.get_record(identity, hit.document_id)? {
                let stored = StoredVector {
                    document_id: record.document_id,
                    vector: record.vector,
                    norm: record.norm,
                };
                similarity.insert(hit.document_id, q.similarity(&stored));
            }
        }

        let alpha = self.config.hybrid_alpha;
        let mut hits: Vec<SearchHit> = order
            .into_iter()
            .map(|id| {
                let sim = similarity.get(&id).copied();
                let l = strengths.get(&id).copied().unwrap_or(0.0);
                let score = sim.map(|s| modulate(s, l, alpha)).unwrap_or(0.0);
                SearchHit {
                    document_id: id,
                    score,
                    bm25: bm25.get(&id).copied(),
                    similarity: sim,
                    rerank_score: None,
                }
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        Ok(hits)
    }

    // --- Vector path ---

    fn vector_hits(&self, query: &str) -> SiftResult<Vec<SearchHit>> {
        let (_, _, nearest) = self.semantic_candidates(query)?;
        Ok(nearest.into_iter().map(|(id, sim)| vector_hit(id, sim)).collect())
    }

    fn semantic_candidates(
        &self,
        query: &str,
    ) -> SiftResult<(ModelIdentity, Arc<Vec<f32>>, Vec<(i64, f64)>)> {
        let identity = self.require_identity()?.clone();
        let q = self.query_vector(&identity, query)?;
        let nearest = self.nearest(&identity, &q, self.config.candidate_pool, None)?;
        Ok((identity, q, nearest))
    }

    fn query_vector(&self, identity: &ModelIdentity, query: &str) -> SiftResult<Arc<Vec<f32>>> {
        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| RetrievalError::VectorUnavailable {
                reason: "no query embedder configured".to_string(),
            })?;
        let text = normalize_text(query);
        let key = ContentHash::compute(&text, identity).into_string();

        let cached = self.query_cache.get(&key);
        self.with_metrics(|m| m.record_cache_lookup(cached.is_some()));
        if let Some(v) = cached {
            return Ok(v);
        }

        let mut vectors = embedder.embed(&[text])?;
        let v = match vectors.pop() {
            Some(v) if vectors.is_empty() && !v.is_empty() => Arc::new(v),
            _ => {
                return Err(RetrievalError::VectorUnavailable {
                    reason: "embedder returned no query vector".to_string(),
                }
                .into())
            }
        };
        self.query_cache.insert(key, Arc::clone(&v));
        Ok(v)
    }

    /// Nearest stored vectors through the ANN index when it is fresh and at
    /// the query dimension, otherwise by exhaustive scan.
    fn nearest(
        &self,
        identity: &ModelIdentity,
        query: &[f32],
        k: usize,
        exclude: Option<i64>,
    ) -> SiftResult<Vec<(i64, f64)>> {
        let index = self
            .index
            .read()
            .map(|slot| slot.clone())
            .unwrap_or(None);
        if let Some(index) = index {
            let fingerprint = self.store.fingerprint(identity)?;
            if index.usable_for(identity, &fingerprint, query.len()) {
                let mut hits = index.search(query, k + usize::from(exclude.is_some()));
                hits.retain(|(id, _)| Some(*id) != exclude);
                hits.truncate(k);
                return Ok(hits);
            }
            self.degrade(
                ANN_INDEX,
                "index is stale or built at another dimension",
                "linear scan",
            );
        }
        let vectors = self.store.scan_vectors(identity)?;
        Ok(vector::scan(&vectors, &QueryVector::new(query), k, exclude))
    }

    // --- Rerank ---

    fn rerank(&self, query: &str, hits: Vec<SearchHit>) -> Vec<SearchHit> {
        let Some(reranker) = self.reranker.as_ref() else {
            return hits;
        };
        let k = self.config.rerank_top_k.min(hits.len());
        if k == 0 {
            return hits;
        }

        let ids: Vec<i64> = hits[..k].iter().map(|h| h.document_id).collect();
        let texts = match self.corpus.texts_for(&ids) {
            Ok(texts) => texts,
            Err(e) => {
                self.with_metrics(|m| m.record_rerank(false));
                self.degrade(RERANK, &e.to_string(), "fused order");
                return hits;
            }
        };
        let shortlist: Vec<String> = ids
            .iter()
            .map(|id| texts.get(id).map(|t| normalize_text(t)).unwrap_or_default())
            .collect();

        let (hits, err) = rerank_or_keep(reranker.as_ref(), query, hits, &shortlist, k);
        self.with_metrics(|m| m.record_rerank(err.is_none()));
        match err {
            Some(e) => self.degrade(RERANK, &e.to_string(), "fused order"),
            None => {
                self.degradation
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .mark_recovered(RERANK);
            }
        }
        hits
    }

    // --- Bookkeeping ---

    fn require_identity(&self) -> Result<&ModelIdentity, RetrievalError> {
        self.identity
            .as_ref()
            .ok_or_else(|| RetrievalError::VectorUnavailable {
                reason: "no embedding identity configured".to_string(),
            })
    }

    fn degrade(&self, component: &str, failure: &str, fallback: &str) {
        self.degradation
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .record(DegradationEvent::now(component, failure, fallback));
    }

    fn record_fallback(&self) {
        self.with_metrics(|m| m.record_fallback());
    }

    fn record_query(&self, mode: SearchMode, hit: bool, latency: Duration) {
        self.with_metrics(|m| m.record_query(mode, hit, latency));
    }

    fn with_metrics(&self, f: impl FnOnce(&mut RetrievalMetrics)) {
        if let Ok(mut m) = self.metrics.lock() {
            f(&mut m);
        }
    }
}

fn vector_hit(document_id: i64, similarity: f64) -> SearchHit {
    let mut hit = SearchHit::new(document_id, similarity);
    hit.similarity = Some(similarity);
    hit
}

fn no_search_path(lexical: &SiftError, vector: &SiftError) -> SiftError {
    info!(lexical = %lexical, vector = %vector, "no search path available");
    RetrievalError::NoSearchPath {
        lexical: lexical.to_string(),
        vector: vector.to_string(),
    }
    .into()
}
