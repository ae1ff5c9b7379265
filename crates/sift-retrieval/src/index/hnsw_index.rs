//! HNSW approximate nearest-neighbor index over one (backend, model).
//!
//! Built out of band from a snapshot of the store. The index remembers the
//! store fingerprint it was built from; a query only uses it while the
//! fingerprint still matches and the query has the index dimension.
//!
//! Records of another dimension (left behind by a dimension change) are not
//! inserted into the graph. They are kept aside and scanned with the
//! overlap cosine on every query, so the index answers for the whole store.

use std::collections::HashMap;
use std::time::Instant;

use hnsw_rs::prelude::{DistDot, Hnsw};
use sift_core::config::RetrievalConfig;
use sift_core::errors::{RetrievalError, SiftResult};
use sift_core::models::{IndexFingerprint, ModelIdentity, StoredVector};

use crate::search::vector::{self, QueryVector};

const MAX_LAYER: usize = 16;
const DIST_DOT_SHRINK: f32 = 0.999_999;

/// Build and query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnParams {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

impl AnnParams {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            m: config.ann_m,
            ef_construction: config.ann_ef_construction,
            ef_search: config.ann_ef_search,
        }
    }

    fn validate(&self) -> Result<(), RetrievalError> {
        let bad = |reason: &str| RetrievalError::IndexBuildFailed {
            reason: reason.to_string(),
        };
        if self.m == 0 || self.m > 256 {
            return Err(bad("ann_m must be in 1..=256"));
        }
        if self.ef_construction == 0 {
            return Err(bad("ann_ef_construction must be greater than zero"));
        }
        if self.ef_search == 0 {
            return Err(bad("ann_ef_search must be greater than zero"));
        }
        Ok(())
    }
}

pub struct AnnIndex {
    hnsw: Hnsw<'static, f32, DistDot>,
    doc_ids: Vec<i64>,
    identity: ModelIdentity,
    fingerprint: IndexFingerprint,
    dimension: usize,
    params: AnnParams,
    off_dimension: Vec<StoredVector>,
    skipped: usize,
    build_ms: u64,
}

impl std::fmt::Debug for AnnIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnIndex")
            .field("identity", &self.identity)
            .field("points", &self.doc_ids.len())
            .field("dimension", &self.dimension)
            .field("off_dimension", &self.off_dimension.len())
            .field("skipped", &self.skipped)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl AnnIndex {
    /// Build from every stored vector of `identity`.
    ///
    /// The index dimension is the most common record dimension (ties go to
    /// the larger one). Records of another dimension are kept for the
    /// side scan; records with non-finite or zero values are skipped and
    /// counted.
    pub fn build(
        identity: ModelIdentity,
        fingerprint: IndexFingerprint,
        vectors: Vec<StoredVector>,
        params: AnnParams,
    ) -> SiftResult<Self> {
        params.validate()?;
        let start = Instant::now();

        let total = vectors.len();
        let dimension = dominant_dimension(&vectors);
        let mut doc_ids = Vec::with_capacity(total);
        let mut normalized = Vec::with_capacity(total);
        let mut off_dimension = Vec::new();
        for v in vectors {
            if !is_indexable(&v.vector) {
                continue;
            }
            if v.vector.len() != dimension {
                off_dimension.push(v);
                continue;
            }
            doc_ids.push(v.document_id);
            normalized.push(normalize_for_dist_dot(v.vector));
        }
        let skipped = total - doc_ids.len() - off_dimension.len();

        let hnsw = Hnsw::new(
            params.m,
            doc_ids.len().max(1),
            MAX_LAYER,
            params.ef_construction,
            DistDot,
        );
        if !normalized.is_empty() {
            let with_ids: Vec<(&Vec<f32>, usize)> =
                normalized.iter().enumerate().map(|(i, v)| (v, i)).collect();
            hnsw.parallel_insert(&with_ids);
        }

        Ok(Self {
            hnsw,
            doc_ids,
            identity,
            fingerprint,
            dimension,
            params,
            off_dimension,
            skipped,
            build_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Whether the index can answer `query` for `identity` given the store's
    /// current fingerprint.
    pub fn usable_for(
        &self,
        identity: &ModelIdentity,
        fingerprint: &IndexFingerprint,
        query_dimension: usize,
    ) -> bool {
        &self.identity == identity
            && &self.fingerprint == fingerprint
            && self.dimension == query_dimension
    }

    /// Up to `k` nearest documents by cosine, best first, ties by id. Graph
    /// neighbours are merged with the off-dimension side scan. Neighbour ids
    /// the index does not know are dropped.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(i64, f64)> {
        if k == 0 || query.len() != self.dimension {
            return Vec::new();
        }
        let mut hits = self.graph_search(query, k);
        if !self.off_dimension.is_empty() {
            hits.extend(vector::scan(
                &self.off_dimension,
                &QueryVector::new(query),
                k,
                None,
            ));
        }
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits.truncate(k);
        hits
    }

    fn graph_search(&self, query: &[f32], k: usize) -> Vec<(i64, f64)> {
        if self.doc_ids.is_empty() {
            return Vec::new();
        }
        let k = k.min(self.doc_ids.len());
        let ef = self.params.ef_search.max(k).max(1);
        let normalized = normalize_for_dist_dot(query.to_vec());
        self.hnsw
            .search(&normalized, k, ef)
            .into_iter()
            .filter_map(|n| {
                let id = *self.doc_ids.get(n.d_id)?;
                Some((id, (1.0 - n.distance) as f64))
            })
            .collect()
    }

    /// Documents the index answers for, side-scanned ones included.
    pub fn len(&self) -> usize {
        self.doc_ids.len() + self.off_dimension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records held for the side scan because their dimension differs.
    pub fn off_dimension(&self) -> usize {
        self.off_dimension.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn build_ms(&self) -> u64 {
        self.build_ms
    }

    pub fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    pub fn fingerprint(&self) -> &IndexFingerprint {
        &self.fingerprint
    }
}

fn dominant_dimension(vectors: &[StoredVector]) -> usize {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for v in vectors {
        *counts.entry(v.vector.len()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(dim, _)| dim)
        .unwrap_or(0)
}

fn is_indexable(v: &[f32]) -> bool {
    !v.is_empty() && v.iter().all(|x| x.is_finite()) && v.iter().any(|x| *x != 0.0)
}

fn normalize_for_dist_dot(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        let inv = DIST_DOT_SHRINK / norm;
        for v in &mut vector {
            *v *= inv;
        }
    }
    vector
}
