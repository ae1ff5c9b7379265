//! Lexical path: FTS5 BM25 through the corpus store, re-fused with a
//! trigram-overlap ranking of the same candidates.

use std::collections::HashMap;

use sift_core::config::RetrievalConfig;
use sift_core::errors::SiftResult;
use sift_core::models::{LexicalHit, SearchHit};
use sift_core::normalize_text;
use sift_core::traits::ICorpusStore;
use tracing::debug;

use super::{rrf_fusion, trigram};
use crate::keywords;

/// Matches for `query`, best BM25 first. Tries the keyword expression, then
/// the plain content words when the keywords find nothing. Empty when the
/// query has no usable terms.
pub fn candidates(
    corpus: &dyn ICorpusStore,
    query: &str,
    config: &RetrievalConfig,
) -> SiftResult<Vec<LexicalHit>> {
    let keywords = keywords::extract_keywords(query, config.keyword_top_k);
    let content = keywords::content_terms(query, config.keyword_top_k.max(1) * 2);

    let mut tried: Option<String> = None;
    for terms in [&keywords, &content] {
        let Some(expression) = keywords::render_expression(terms, config.near_distance) else {
            continue;
        };
        if tried.as_deref() == Some(expression.as_str()) {
            continue;
        }
        let hits = corpus.search_lexical(&expression, config.candidate_pool)?;
        debug!(expression = %expression, hits = hits.len(), "lexical query");
        if !hits.is_empty() {
            return Ok(hits);
        }
        tried = Some(expression);
    }
    Ok(Vec::new())
}

/// Lexical-mode ranking: BM25 order and trigram order fused with RRF.
pub fn search(
    corpus: &dyn ICorpusStore,
    query: &str,
    config: &RetrievalConfig,
) -> SiftResult<Vec<SearchHit>> {
    let hits = candidates(corpus, query, config)?;
    rank(corpus, query, &hits, config)
}

/// Fuse already fetched lexical candidates with their trigram ranking.
pub fn rank(
    corpus: &dyn ICorpusStore,
    query: &str,
    hits: &[LexicalHit],
    config: &RetrievalConfig,
) -> SiftResult<Vec<SearchHit>> {
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = hits.iter().map(|h| h.document_id).collect();
    let texts = corpus.texts_for(&ids)?;
    let with_text: Vec<(i64, String)> = ids
        .iter()
        .filter_map(|id| texts.get(id).map(|t| (*id, normalize_text(t))))
        .collect();
    let trigram_order = trigram::rank(query, &with_text);

    let bm25: HashMap<i64, f64> = hits.iter().map(|h| (h.document_id, h.bm25)).collect();
    let fused = rrf_fusion::fuse(&[ids, trigram_order], config.rrf_k);
    Ok(fused
        .into_iter()
        .map(|c| {
            let mut hit = SearchHit::new(c.document_id, c.rrf_score);
            hit.bm25 = bm25.get(&c.document_id).copied();
            hit
        })
        .collect())
}
