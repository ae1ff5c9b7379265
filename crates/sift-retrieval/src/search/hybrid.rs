//! Lexical modulation of semantic scores.
//!
//! `score = s ^ exp(α · (½ − l))` where `s` is the cosine clamped to [0, 1]
//! and `l` the lexical strength in [0, 1]. With `l = ½` the cosine passes
//! through unchanged; stronger lexical support lifts it toward 1, none at
//! all pushes it toward 0.

use std::collections::HashMap;

use sift_core::models::LexicalHit;

/// BM25 relevance from an FTS5 cost. FTS5 reports lower-is-better values
/// that are negative for matches.
pub fn relevance(bm25: f64) -> f64 {
    if bm25.is_finite() {
        (-bm25).max(0.0)
    } else {
        0.0
    }
}

/// Saturating lexical strength for each lexical hit: `r / (r + τ)` with `τ`
/// the mean relevance over `hits`. Documents absent from the map have
/// strength 0.
pub fn lexical_strengths(hits: &[LexicalHit]) -> HashMap<i64, f64> {
    let relevances: Vec<(i64, f64)> = hits
        .iter()
        .map(|h| (h.document_id, relevance(h.bm25)))
        .collect();
    if relevances.is_empty() {
        return HashMap::new();
    }
    let tau = relevances.iter().map(|(_, r)| r).sum::<f64>() / relevances.len() as f64;
    relevances
        .into_iter()
        .map(|(id, r)| (id, strength(r, tau)))
        .collect()
}

/// `r / (r + τ)`, 0 when both are 0.
pub fn strength(r: f64, tau: f64) -> f64 {
    let denom = r + tau;
    if denom > 0.0 && denom.is_finite() {
        (r / denom).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Fuse a cosine similarity with a lexical strength.
pub fn modulate(similarity: f64, lexical: f64, alpha: f64) -> f64 {
    let s = if similarity.is_finite() {
        similarity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let l = if lexical.is_finite() {
        lexical.clamp(0.0, 1.0)
    } else {
        0.0
    };
    s.powf((alpha * (0.5 - l)).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_strength_is_identity() {
        assert!((modulate(0.7, 0.5, 2.0) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn lexical_support_lifts_score() {
        let s = 0.6;
        assert!(modulate(s, 0.9, 2.0) > modulate(s, 0.5, 2.0));
        assert!(modulate(s, 0.0, 2.0) < modulate(s, 0.5, 2.0));
    }

    #[test]
    fn endpoints_are_fixed() {
        assert_eq!(modulate(0.0, 1.0, 2.0), 0.0);
        assert_eq!(modulate(1.0, 0.0, 2.0), 1.0);
        assert_eq!(modulate(-0.3, 1.0, 2.0), 0.0);
    }

    #[test]
    fn strengths_are_relative_to_the_mean() {
        let hits = vec![
            LexicalHit { document_id: 1, bm25: -3.0 },
            LexicalHit { document_id: 2, bm25: -1.0 },
        ];
        let l = lexical_strengths(&hits);
        // τ = 2
        assert!((l[&1] - 0.6).abs() < 1e-12);
        assert!((l[&2] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_relevance_has_zero_strength() {
        let hits = vec![LexicalHit { document_id: 1, bm25: 0.0 }];
        assert_eq!(lexical_strengths(&hits)[&1], 0.0);
        assert_eq!(relevance(2.5), 0.0);
    }
}
