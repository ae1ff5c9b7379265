//! Reciprocal Rank Fusion: score = Σ 1/(k + rank_i)
//!
//! Combines ranked lists without normalizing their raw scores against each
//! other. Ranks are 1-based.

use std::collections::HashMap;

/// A document after fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrfCandidate {
    pub document_id: i64,
    /// Fused score (higher = more relevant).
    pub rrf_score: f64,
}

/// Fuse ranked lists of document ids. Position in each list is the rank.
///
/// Ties keep the order in which documents were first seen across the lists,
/// so the first list breaks ties.
pub fn fuse(ranked_lists: &[Vec<i64>], k: u32) -> Vec<RrfCandidate> {
    let mut scores: HashMap<i64, f64> = HashMap::new();
    let mut first_seen: Vec<i64> = Vec::new();

    for list in ranked_lists {
        for (position, id) in list.iter().enumerate() {
            let rank = position + 1;
            let rrf = 1.0 / (k as f64 + rank as f64);
            let entry = scores.entry(*id).or_insert_with(|| {
                first_seen.push(*id);
                0.0
            });
            *entry += rrf;
        }
    }

    let mut candidates: Vec<RrfCandidate> = first_seen
        .into_iter()
        .map(|document_id| RrfCandidate {
            document_id,
            rrf_score: scores.get(&document_id).copied().unwrap_or_default(),
        })
        .collect();

    // Stable sort keeps first-seen order among equal scores.
    candidates.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    candidates
}
