use std::collections::HashSet;

use proptest::prelude::*;
use sift_retrieval::search::hybrid::{modulate, strength};
use sift_retrieval::search::{fuse, trigram};

proptest! {
    #[test]
    fn modulated_score_stays_in_unit_interval(
        s in -2.0f64..2.0,
        l in -1.0f64..2.0,
        alpha in 0.0f64..8.0,
    ) {
        let score = modulate(s, l, alpha);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn higher_similarity_never_loses(
        s1 in 0.01f64..0.98,
        gap in 1e-3f64..0.5,
        l in 0.0f64..=1.0,
        alpha in 0.1f64..4.0,
    ) {
        let s2 = (s1 + gap).min(0.99);
        prop_assume!(s2 > s1);
        prop_assert!(modulate(s2, l, alpha) > modulate(s1, l, alpha));
    }

    #[test]
    fn stronger_lexical_support_lifts_score(
        s in 0.01f64..0.99,
        l1 in 0.0f64..0.98,
        gap in 0.01f64..1.0,
        alpha in 0.1f64..4.0,
    ) {
        let l2 = (l1 + gap).min(1.0);
        prop_assume!(l2 > l1);
        prop_assert!(modulate(s, l2, alpha) > modulate(s, l1, alpha));
    }

    #[test]
    fn strength_is_bounded(r in 0.0f64..100.0, tau in 0.0f64..100.0) {
        let l = strength(r, tau);
        prop_assert!((0.0..=1.0).contains(&l));
    }

    #[test]
    fn rrf_output_is_sorted_and_complete(
        lists in prop::collection::vec(
            prop::collection::hash_set(0i64..50, 0..20),
            1..4,
        ),
        k in 1u32..100,
    ) {
        let lists: Vec<Vec<i64>> = lists.into_iter().map(|s| s.into_iter().collect()).collect();
        let fused = fuse(&lists, k);

        let expected: HashSet<i64> = lists.iter().flatten().copied().collect();
        let got: HashSet<i64> = fused.iter().map(|c| c.document_id).collect();
        prop_assert_eq!(&got, &expected);
        prop_assert_eq!(fused.len(), expected.len());

        let ceiling = lists.len() as f64 / (k as f64 + 1.0);
        for pair in fused.windows(2) {
            prop_assert!(pair[0].rrf_score >= pair[1].rrf_score);
        }
        for c in &fused {
            prop_assert!(c.rrf_score > 0.0 && c.rrf_score <= ceiling + 1e-12);
        }
    }

    #[test]
    fn trigram_coverage_is_a_fraction(q in "[a-z ]{1,40}", text in "[a-z ]{0,80}") {
        let grams = trigram::trigrams(&q);
        let c = trigram::coverage(&grams, &text);
        prop_assert!((0.0..=1.0).contains(&c));
    }
}
