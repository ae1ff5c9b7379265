//! Exhaustive cosine scan over stored vectors.

use rayon::prelude::*;
use sift_core::models::StoredVector;
use sift_core::vector::{dot, l2_norm};
use sift_embeddings::matryoshka::overlap_cosine;

/// A query vector with its norm computed once.
pub struct QueryVector<'a> {
    values: &'a [f32],
    norm: f64,
}

impl<'a> QueryVector<'a> {
    pub fn new(values: &'a [f32]) -> Self {
        Self {
            values,
            norm: l2_norm(values) as f64,
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f32] {
        self.values
    }

    /// Cosine against a stored vector.
    ///
    /// Same dimension uses the stored norm unless it is unusable, in which
    /// case the norm is recomputed. Different dimensions compare the shared
    /// prefix, both sides renormalized.
    pub fn similarity(&self, stored: &StoredVector) -> f64 {
        if stored.vector.len() != self.values.len() {
            return overlap_cosine(self.values, &stored.vector);
        }
        let stored_norm = if stored.norm.is_finite() && stored.norm > 0.0 {
            stored.norm as f64
        } else {
            l2_norm(&stored.vector) as f64
        };
        if self.norm == 0.0 || stored_norm == 0.0 {
            return 0.0;
        }
        let sim = dot(self.values, &stored.vector) / (self.norm * stored_norm);
        if sim.is_finite() {
            sim
        } else {
            0.0
        }
    }
}

/// Top `limit` documents by cosine to `query`, best first. Equal scores are
/// ordered by document id. `exclude` drops one document (the seed of a
/// similar-to query).
pub fn scan(
    vectors: &[StoredVector],
    query: &QueryVector<'_>,
    limit: usize,
    exclude: Option<i64>,
) -> Vec<(i64, f64)> {
    if limit == 0 || query.dimension() == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(i64, f64)> = vectors
        .par_iter()
        .filter(|v| Some(v.document_id) != exclude)
        .map(|v| (v.document_id, query.similarity(v)))
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: i64, vector: Vec<f32>) -> StoredVector {
        let norm = l2_norm(&vector);
        StoredVector {
            document_id: id,
            vector,
            norm,
        }
    }

    #[test]
    fn scan_orders_by_cosine() {
        let vectors = vec![
            stored(1, vec![0.0, 1.0]),
            stored(2, vec![1.0, 0.1]),
            stored(3, vec![1.0, 0.0]),
        ];
        let q = [1.0, 0.0];
        let hits = scan(&vectors, &QueryVector::new(&q), 2, None);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![3, 2]);
        assert!((hits[0].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn exclude_drops_the_seed() {
        let vectors = vec![stored(1, vec![1.0, 0.0]), stored(2, vec![0.9, 0.1])];
        let q = [1.0, 0.0];
        let hits = scan(&vectors, &QueryVector::new(&q), 5, Some(1));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 2);
    }

    #[test]
    fn bad_stored_norm_is_recomputed() {
        let mut v = stored(1, vec![3.0, 4.0]);
        v.norm = f32::NAN;
        let q = [3.0, 4.0];
        assert!((QueryVector::new(&q).similarity(&v) - 1.0).abs() < 1e-6);
        v.norm = 0.0;
        assert!((QueryVector::new(&q).similarity(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn dimension_mismatch_uses_shared_prefix() {
        let v = stored(1, vec![1.0, 0.0, 0.0, 5.0]);
        let q = [1.0, 0.0];
        assert!((QueryVector::new(&q).similarity(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_query_scores_zero() {
        let v = stored(1, vec![1.0, 0.0]);
        let q = [0.0, 0.0];
        assert_eq!(QueryVector::new(&q).similarity(&v), 0.0);
    }
}
