//! Keyword and phrase extraction for building lexical query expressions.
//!
//! Tuned for technical and biomedical text: hyphenated terms stay whole,
//! stopwords and roman numerals are dropped, domain suffixes boost a term,
//! and adjective + noun pairs become phrases.

use std::collections::HashSet;
use std::sync::LazyLock;

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "by", "for", "from", "has", "have", "he", "her",
        "his", "i", "in", "is", "it", "its", "of", "on", "or", "she", "that", "the", "their",
        "then", "there", "these", "they", "this", "those", "to", "was", "were", "will", "with",
        "without", "within", "into", "over", "under", "out", "across", "after", "before",
        "along", "during", "plus", "minus", "per", "via", "yes", "no", "not", "treat", "treats",
        "treated", "treating", "type", "types", "ii", "iii", "iv", "v", "vi", "vii", "viii",
        "ix", "x", "xi", "xii", "one", "two", "three", "four", "five", "six", "seven", "eight",
        "nine", "ten",
    ]
    .into_iter()
    .collect()
});

const NOUN_SUFFIXES: &[&str] = &[
    "itis", "emia", "osis", "oma", "pathy", "algia", "uria", "plasty", "scopy", "graphy",
    "ectomy", "otomy", "ostomy", "ology", "logy", "gen", "genic", "ase", "ose", "in", "ide",
    "one", "olol", "pril", "sartan", "azole", "caine", "dopa", "mycin", "cycline", "cillin",
    "mab", "ia", "sia",
];

const ADJ_SUFFIXES: &[&str] = &["ic", "al", "oid"];

const HYPHENS: &[char] = &[
    '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}',
    '\u{2043}', '\u{FE58}', '\u{FE63}', '\u{FF0D}',
];

const MIN_UNIGRAM_SCORE: f64 = 2.2;
const MIN_BIGRAM_SCORE: f64 = 3.0;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token.to_lowercase().as_str())
}

fn is_roman(token: &str) -> bool {
    let n = char_len(token);
    n > 0
        && n <= 6
        && token
            .to_uppercase()
            .chars()
            .all(|c| matches!(c, 'I' | 'V' | 'X' | 'L' | 'C' | 'D' | 'M'))
}

/// Split into word tokens. A hyphen between two word characters stays
/// inside the token; any dash variant counts as a hyphen.
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text
        .chars()
        .map(|c| if HYPHENS.contains(&c) { '-' } else { c })
        .collect();
    let mut tokens = Vec::new();
    let mut buf = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() {
            buf.push(c);
            continue;
        }
        let inner_hyphen = c == '-'
            && i > 0
            && i + 1 < chars.len()
            && chars[i - 1].is_alphanumeric()
            && chars[i + 1].is_alphanumeric();
        if inner_hyphen {
            buf.push(c);
            continue;
        }
        if !buf.is_empty() {
            tokens.push(std::mem::take(&mut buf));
        }
    }
    if !buf.is_empty() {
        tokens.push(buf);
    }
    tokens
}

fn is_domain_noun(token: &str) -> bool {
    let t = token.to_lowercase();
    if t.contains('-')
        && (t.ends_with("ase") || t.ends_with("gen") || t.split('-').any(|p| p.ends_with("ase")))
    {
        return true;
    }
    let n = char_len(&t);
    NOUN_SUFFIXES
        .iter()
        .any(|suf| t.ends_with(suf) && n >= 4.max(char_len(suf) + 1))
}

fn is_adjective_like(token: &str) -> bool {
    let t = token.to_lowercase();
    let n = char_len(&t);
    ADJ_SUFFIXES.iter().any(|suf| t.ends_with(suf) && n >= 4)
}

/// Capitalized word with lowercase remainder, e.g. a drug or proper name.
fn is_title_case(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let rest: Vec<char> = chars.collect();
    first.is_uppercase()
        && rest.iter().any(|c| c.is_lowercase())
        && !rest.iter().any(|c| c.is_uppercase())
}

fn score_unigram(token: &str) -> f64 {
    let lower = token.to_lowercase();
    if is_stopword(token) || is_roman(token) {
        return -1.0;
    }
    let n = char_len(token);
    let mut score = 0.0;
    if token.contains('-') {
        score += 2.0;
    }
    if is_domain_noun(token) {
        score += 2.0;
    }
    if is_title_case(token) && n >= 7 {
        score += 1.8;
    }
    if n >= 8 {
        score += 0.4;
    }
    if lower.ends_with("ing") || lower.ends_with("ed") || lower.ends_with('s') {
        score -= 0.6;
    }
    score
}

fn score_bigram(first: &str, second: &str) -> f64 {
    if is_stopword(first) || is_stopword(second) || is_roman(first) || is_roman(second) {
        return -1.0;
    }
    let mut score = 2.2;
    if is_adjective_like(first) && is_domain_noun(second) {
        score += 2.2;
    }
    if char_len(first) >= 6 {
        score += 0.2;
    }
    if char_len(second) >= 6 {
        score += 0.4;
    }
    score
}

/// Up to `top_k` keywords and phrases, strongest first. Unigrams already
/// covered by a kept phrase are dropped.
pub fn extract_keywords(text: &str, top_k: usize) -> Vec<String> {
    let tokens = tokenize(text);

    let unigrams: Vec<(String, f64)> = tokens
        .iter()
        .map(|t| (t.clone(), score_unigram(t)))
        .filter(|(_, s)| *s >= MIN_UNIGRAM_SCORE)
        .collect();

    let mut bigrams: Vec<(String, f64)> = tokens
        .windows(2)
        .map(|w| (format!("{} {}", w[0], w[1]), score_bigram(&w[0], &w[1])))
        .filter(|(_, s)| *s >= MIN_BIGRAM_SCORE)
        .collect();
    bigrams.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let phrase_words: HashSet<String> = bigrams
        .iter()
        .flat_map(|(p, _)| p.split(' ').map(str::to_lowercase).collect::<Vec<_>>())
        .collect();

    let mut merged: Vec<(String, f64)> = bigrams;
    merged.extend(
        unigrams
            .into_iter()
            .filter(|(t, _)| !phrase_words.contains(&t.to_lowercase())),
    );
    merged.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (term, _) in merged {
        if out.len() >= top_k {
            break;
        }
        if seen.insert(term.to_lowercase()) {
            out.push(term);
        }
    }
    out
}

/// Content words of a query: tokens that are neither stopwords nor single
/// characters, deduplicated case-insensitively, in query order.
pub fn content_terms(text: &str, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| char_len(t) > 1 && !is_stopword(t))
        .filter(|t| seen.insert(t.to_lowercase()))
        .take(limit)
        .collect()
}

fn quote(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// FTS5 expression for a free-text query: an OR of quoted keywords and
/// phrases, plus a NEAR group over all of them when there are several.
///
/// Falls back to the query's content words when the extractor finds no
/// keywords. Returns `None` when the query has no usable terms.
pub fn lexical_expression(query: &str, top_k: usize, near_distance: u32) -> Option<String> {
    let mut terms = extract_keywords(query, top_k);
    if terms.is_empty() {
        terms = content_terms(query, top_k.max(1) * 2);
    }
    render_expression(&terms, near_distance)
}

/// Render terms as `"t1" OR "t2" OR NEAR("t1" "t2", d)`. `None` for no terms.
pub fn render_expression(terms: &[String], near_distance: u32) -> Option<String> {
    if terms.is_empty() {
        return None;
    }
    let quoted: Vec<String> = terms.iter().map(|t| quote(t)).collect();
    let mut parts = quoted.clone();
    if quoted.len() > 1 {
        parts.push(format!("NEAR({}, {})", quoted.join(" "), near_distance));
    }
    Some(parts.join(" OR "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str =
        "Finasteride treats androgenetic alopecia by inhibiting types II and III 5α-reductase.";

    #[test]
    fn extracts_the_reference_note() {
        assert_eq!(
            extract_keywords(NOTE, 5),
            vec!["androgenetic alopecia", "5α-reductase", "Finasteride"]
        );
    }

    #[test]
    fn adjective_noun_pair_becomes_a_phrase() {
        assert_eq!(
            extract_keywords("Chronic pancreatitis causes steatorrhea and diabetes", 5),
            vec!["Chronic pancreatitis"]
        );
    }

    #[test]
    fn hyphen_variants_are_normalized_and_kept() {
        assert_eq!(tokenize("HMG\u{2013}CoA reductase"), vec!["HMG-CoA", "reductase"]);
        assert_eq!(tokenize("- dash -edge-"), vec!["dash", "edge"]);
    }

    #[test]
    fn roman_numerals_and_stopwords_are_dropped() {
        assert!(extract_keywords("the and of II III", 5).is_empty());
        assert!(is_roman("xii"));
        assert!(!is_roman("alopecia"));
    }

    #[test]
    fn top_k_limits_output() {
        assert_eq!(extract_keywords(NOTE, 1), vec!["androgenetic alopecia"]);
    }

    #[test]
    fn expression_quotes_terms_and_adds_near_group() {
        let expr = lexical_expression(NOTE, 5, 10).unwrap();
        assert_eq!(
            expr,
            "\"androgenetic alopecia\" OR \"5α-reductase\" OR \"Finasteride\" OR \
             NEAR(\"androgenetic alopecia\" \"5α-reductase\" \"Finasteride\", 10)"
        );
    }

    #[test]
    fn expression_falls_back_to_content_words() {
        let expr = lexical_expression("blood pressure", 5, 10).unwrap();
        assert_eq!(expr, "\"blood\" OR \"pressure\" OR NEAR(\"blood\" \"pressure\", 10)");
    }

    #[test]
    fn hyphenated_acronym_alone_is_not_enough() {
        assert_eq!(extract_keywords("Statins inhibit HMG-CoA reductase", 5), vec!["reductase"]);
    }

    #[test]
    fn expression_escapes_quotes_and_rejects_empty_queries() {
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(lexical_expression("\"edema\"", 5, 10).unwrap(), "\"edema\"");
        assert!(lexical_expression("the of ...", 5, 10).is_none());
        assert!(lexical_expression("", 5, 10).is_none());
    }
}
