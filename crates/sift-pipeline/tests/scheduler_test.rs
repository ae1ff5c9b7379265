//! Hash-gated enqueue, pick, and completion through the scheduler.

mod common;

use std::sync::Arc;

use sift_core::models::{Document, JobPayload, JobStatus};
use sift_core::ContentHash;
use sift_pipeline::{drain_blocking, WorkerExit};
use test_fixtures::StubBackend;

use common::{Harness, DIMS};

#[test]
fn scenario_a_fresh_corpus_is_fully_embedded() {
    let backend = Arc::new(StubBackend::new(DIMS));
    let h = Harness::new(
        &[(1, "alpha notes"), (2, "beta notes"), (3, "gamma notes")],
        backend.clone(),
    );

    assert_eq!(h.scheduler.enqueue(false).unwrap(), 3);

    let ctx = h.context(16, None);
    let exits = drain_blocking(&ctx, 1);
    assert!(matches!(exits[0], Ok(WorkerExit::Drained)));

    let counts = h.scheduler.counts().unwrap();
    assert_eq!(counts.done, 3);
    assert_eq!(counts.pending, 0);
    assert_eq!(h.store.record_count(h.scheduler.identity()).unwrap(), 3);
}

#[test]
fn enqueue_twice_without_changes_returns_zero() {
    let h = Harness::new(&[(1, "alpha"), (2, "beta")], Arc::new(StubBackend::new(DIMS)));
    assert_eq!(h.scheduler.enqueue(false).unwrap(), 2);
    assert_eq!(h.scheduler.enqueue(false).unwrap(), 0);

    drain_blocking(&h.context(16, None), 1);
    assert_eq!(h.scheduler.enqueue(false).unwrap(), 0);
}

#[test]
fn scenario_b_edit_requeues_exactly_one_document() {
    let texts: Vec<(i64, String)> = (1..=10).map(|id| (id, format!("note {id}"))).collect();
    let h = Harness::new(&common::borrowed(&texts), Arc::new(StubBackend::new(DIMS)));
    h.scheduler.enqueue(false).unwrap();
    drain_blocking(&h.context(4, None), 2);

    let identity = h.scheduler.identity().clone();
    let before = h.store.get_record(&identity, 7).unwrap().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    h.corpus
        .upsert_document(&Document::new(7, "note 7, revised with new findings"))
        .unwrap();
    assert_eq!(h.scheduler.enqueue(false).unwrap(), 1);

    drain_blocking(&h.context(4, None), 1);
    let after = h.store.get_record(&identity, 7).unwrap().unwrap();
    assert_eq!(
        after.hash,
        ContentHash::of_raw("note 7, revised with new findings", &identity).into_string()
    );
    assert_ne!(after.hash, before.hash);
    assert!(after.updated_at > before.updated_at);

    let untouched = h.store.get_record(&identity, 3).unwrap().unwrap();
    assert_eq!(untouched.hash, ContentHash::of_raw("note 3", &identity).into_string());
}

#[test]
fn markup_only_edit_is_not_requeued() {
    let h = Harness::new(&[(1, "beta blockers")], Arc::new(StubBackend::new(DIMS)));
    h.scheduler.enqueue(false).unwrap();
    drain_blocking(&h.context(4, None), 1);

    h.corpus
        .upsert_document(&Document::new(1, "<b>beta</b>   blockers"))
        .unwrap();
    assert_eq!(h.scheduler.enqueue(false).unwrap(), 0);
}

#[test]
fn rebuild_all_requeues_every_document() {
    let h = Harness::new(&[(1, "alpha"), (2, "beta")], Arc::new(StubBackend::new(DIMS)));
    h.scheduler.enqueue(false).unwrap();
    drain_blocking(&h.context(4, None), 1);
    assert_eq!(h.scheduler.enqueue(true).unwrap(), 2);
}

#[test]
fn empty_documents_are_skipped() {
    let h = Harness::new(
        &[(1, "alpha"), (2, "<div>[sound:clip.mp3]</div>"), (3, "   ")],
        Arc::new(StubBackend::new(DIMS)),
    );
    assert_eq!(h.scheduler.enqueue(false).unwrap(), 1);
}

#[test]
fn pick_joins_normalized_text_and_payload() {
    let h = Harness::new(&[(1, "<p>heart&nbsp;failure</p>")], Arc::new(StubBackend::new(DIMS)));
    h.scheduler.enqueue(false).unwrap();

    let batch = h.scheduler.pick_batch(8).unwrap();
    assert_eq!(batch.len(), 1);
    let job = &batch[0];
    assert_eq!(job.text, "heart failure");
    assert_eq!(job.payload, JobPayload::Cloud { dimensions: DIMS });
    assert_eq!(job.state.attempts, 0);
    assert_eq!(job.content_hash.as_str(), job.state.job_hash);

    let stored = h.store.get_job(h.scheduler.identity(), 1).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::InProgress);
    assert!(stored.started_at.is_some());
}

#[test]
fn vanished_document_job_is_dropped_at_pick() {
    let h = Harness::new(&[(1, "alpha"), (2, "beta")], Arc::new(StubBackend::new(DIMS)));
    h.scheduler.enqueue(false).unwrap();
    h.corpus.delete_document(2).unwrap();

    let batch = h.scheduler.pick_batch(8).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].document_id(), 1);
    assert!(h.store.get_job(h.scheduler.identity(), 2).unwrap().is_none());
}

#[test]
fn enqueue_prunes_removed_documents() {
    let h = Harness::new(&[(1, "alpha"), (2, "beta")], Arc::new(StubBackend::new(DIMS)));
    h.scheduler.enqueue(false).unwrap();
    drain_blocking(&h.context(4, None), 1);

    h.corpus.delete_document(1).unwrap();
    assert_eq!(h.scheduler.enqueue(false).unwrap(), 0);
    let identity = h.scheduler.identity();
    assert!(h.store.get_record(identity, 1).unwrap().is_none());
    assert_eq!(h.store.record_count(identity).unwrap(), 1);
}

#[test]
fn edit_during_flight_requeues_instead_of_finishing() {
    let h = Harness::new(&[(1, "original text")], Arc::new(StubBackend::new(DIMS)));
    h.scheduler.enqueue(false).unwrap();
    let batch = h.scheduler.pick_batch(1).unwrap();

    h.corpus
        .upsert_document(&Document::new(1, "edited while embedding"))
        .unwrap();
    assert_eq!(h.scheduler.enqueue(false).unwrap(), 1);

    h.scheduler.complete(&batch, vec![vec![0.5; DIMS]]).unwrap();
    let job = h.store.get_job(h.scheduler.identity(), 1).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
}
