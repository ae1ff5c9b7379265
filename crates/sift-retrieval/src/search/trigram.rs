//! Character-trigram overlap between a query and candidate texts.
//!
//! Gives the lexical path a second ranking that tolerates inflection and
//! spelling variants BM25 misses.

use std::collections::HashSet;

/// Lowercased character trigrams of each whitespace-separated word, padded
/// with one space on each side so short words still yield grams.
pub fn trigrams(text: &str) -> HashSet<String> {
    let mut grams = HashSet::new();
    for word in text.split_whitespace() {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(word.to_lowercase().chars().filter(|c| c.is_alphanumeric()))
            .chain(std::iter::once(' '))
            .collect();
        if padded.len() < 3 {
            continue;
        }
        for window in padded.windows(3) {
            grams.insert(window.iter().collect());
        }
    }
    grams
}

/// Fraction of the query's trigrams present in the text, in [0, 1].
pub fn coverage(query: &HashSet<String>, text: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let doc = trigrams(text);
    let shared = query.iter().filter(|g| doc.contains(*g)).count();
    shared as f64 / query.len() as f64
}

/// Candidate ids ordered by trigram coverage of `query`, best first.
/// Candidates with no shared trigram are left out.
pub fn rank(query: &str, candidates: &[(i64, String)]) -> Vec<i64> {
    let query_grams = trigrams(query);
    let mut scored: Vec<(i64, f64)> = candidates
        .iter()
        .map(|(id, text)| (*id, coverage(&query_grams, text)))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(id, _)| id).collect()
}
