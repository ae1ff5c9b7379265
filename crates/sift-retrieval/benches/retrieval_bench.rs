//! Criterion benchmarks for sift-retrieval.
//!
//! - Linear cosine scan, 10K × 256
//! - HNSW query, 10K × 256
//! - Keyword extraction on a long note
//! - Hybrid modulation of a 200-candidate pool
//! - RRF over two 200-entry lists

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sift_core::config::RetrievalConfig;
use sift_core::models::{BackendKind, IndexFingerprint, LexicalHit, ModelIdentity, StoredVector};
use sift_core::vector::l2_norm;
use sift_retrieval::search::hybrid::{lexical_strengths, modulate};
use sift_retrieval::search::vector::scan;
use sift_retrieval::search::{fuse, QueryVector};
use sift_retrieval::{extract_keywords, AnnIndex, AnnParams};

const DIMS: usize = 256;
const POINTS: usize = 10_000;

/// Deterministic pseudo-random vectors.
fn make_vectors(n: usize, dims: usize) -> Vec<StoredVector> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..n)
        .map(|i| {
            let vector: Vec<f32> = (0..dims)
                .map(|_| {
                    state = state
                        .wrapping_mul(6_364_136_223_846_793_005)
                        .wrapping_add(1_442_695_040_888_963_407);
                    ((state >> 33) as f32 / (1u64 << 31) as f32) - 0.5
                })
                .collect();
            let norm = l2_norm(&vector);
            StoredVector {
                document_id: i as i64,
                vector,
                norm,
            }
        })
        .collect()
}

fn bench_linear_scan(c: &mut Criterion) {
    let vectors = make_vectors(POINTS, DIMS);
    let query = vectors[42].vector.clone();

    c.bench_function("linear_scan_10k_256d", |bench| {
        bench.iter(|| {
            let q = QueryVector::new(&query);
            black_box(scan(&vectors, &q, 50, None));
        });
    });
}

fn bench_hnsw_query(c: &mut Criterion) {
    let vectors = make_vectors(POINTS, DIMS);
    let query = vectors[42].vector.clone();
    let identity = ModelIdentity::with_dimensions(BackendKind::OpenAi, "bench", DIMS);
    let index = AnnIndex::build(
        identity,
        IndexFingerprint::default(),
        vectors,
        AnnParams::from_config(&RetrievalConfig::default()),
    )
    .expect("index build");

    c.bench_function("hnsw_query_10k_256d", |bench| {
        bench.iter(|| black_box(index.search(&query, 50)));
    });
}

fn bench_keyword_extraction(c: &mut Criterion) {
    let note = "Finasteride inhibits 5α-reductase and is used for androgenetic alopecia. \
                Chronic pancreatitis presents with epigastric pain radiating to the back, \
                steatorrhea, and diabetes from islet loss. Statins inhibit HMG-CoA reductase \
                and lower LDL cholesterol in patients with coronary artery disease."
        .repeat(4);

    c.bench_function("extract_keywords_long_note", |bench| {
        bench.iter(|| black_box(extract_keywords(&note, 6)));
    });
}

fn bench_hybrid_modulation(c: &mut Criterion) {
    let lexical: Vec<LexicalHit> = (0..200)
        .map(|i| LexicalHit {
            document_id: i,
            bm25: -(1.0 + (i % 17) as f64 * 0.7),
        })
        .collect();
    let similarities: Vec<(i64, f64)> = (0..200).map(|i| (i, (i % 100) as f64 / 100.0)).collect();

    c.bench_function("hybrid_modulate_200_candidates", |bench| {
        bench.iter(|| {
            let strengths = lexical_strengths(&lexical);
            let scores: Vec<f64> = similarities
                .iter()
                .map(|(id, s)| modulate(*s, strengths.get(id).copied().unwrap_or(0.0), 2.0))
                .collect();
            black_box(scores);
        });
    });
}

fn bench_rrf(c: &mut Criterion) {
    let a: Vec<i64> = (0..200).collect();
    let b: Vec<i64> = (0..200).rev().collect();
    let lists = vec![a, b];

    c.bench_function("rrf_two_lists_200", |bench| {
        bench.iter(|| black_box(fuse(&lists, 60)));
    });
}

criterion_group!(
    benches,
    bench_linear_scan,
    bench_hnsw_query,
    bench_keyword_extraction,
    bench_hybrid_modulation,
    bench_rrf,
);
criterion_main!(benches);
