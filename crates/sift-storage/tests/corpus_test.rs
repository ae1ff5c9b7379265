use sift_core::models::Document;
use sift_core::traits::ICorpusStore;
use sift_storage::SqliteCorpus;

fn corpus() -> SqliteCorpus {
    let corpus = SqliteCorpus::open_in_memory().unwrap();
    for (id, text) in [
        (1, "Beta blockers reduce <b>heart rate</b> and blood pressure"),
        (2, "ACE inhibitors lower blood pressure"),
        (3, "Finasteride treats androgenetic alopecia"),
    ] {
        corpus.upsert_document(&Document::new(id, text)).unwrap();
    }
    corpus
}

#[test]
fn lists_raw_primary_text() {
    let docs = corpus().list_documents().unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0].id, 1);
    assert!(docs[0].text.contains("<b>"));
}

#[test]
fn lexical_search_orders_by_bm25_cost() {
    let corpus = corpus();
    let hits = corpus.search_lexical("\"blood pressure\"", 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].bm25 <= hits[1].bm25);
    // Markup is not indexed.
    assert!(corpus.search_lexical("b", 10).unwrap().is_empty());
}

#[test]
fn updates_and_deletes_reach_the_index() {
    let corpus = corpus();
    corpus
        .upsert_document(&Document::new(2, "ARBs block angiotensin receptors"))
        .unwrap();
    let hits = corpus.search_lexical("angiotensin", 10).unwrap();
    assert_eq!(hits.iter().map(|h| h.document_id).collect::<Vec<_>>(), vec![2]);
    assert_eq!(corpus.get_document(2).unwrap().unwrap().modified, 1);

    assert!(corpus.delete_document(3).unwrap());
    assert!(corpus.search_lexical("alopecia", 10).unwrap().is_empty());
    assert_eq!(corpus.document_count().unwrap(), 2);
}

#[test]
fn texts_for_skips_missing_ids() {
    let texts = corpus().texts_for(&[1, 3, 99]).unwrap();
    assert_eq!(texts.len(), 2);
    assert!(texts[&3].starts_with("Finasteride"));
}
