use proptest::prelude::*;
use sift_embeddings::matryoshka::{overlap_cosine, truncate};
use sift_embeddings::rate_gate::estimate_tokens;

proptest! {
    #[test]
    fn truncation_yields_unit_or_zero_vectors(
        v in prop::collection::vec(-5.0f32..5.0, 2..128),
        cut in 1usize..128,
    ) {
        let target = cut.min(v.len());
        let t = truncate(&v, target).unwrap();
        prop_assert_eq!(t.len(), target);
        let norm: f32 = t.iter().map(|x| x * x).sum::<f32>().sqrt();
        prop_assert!((norm - 1.0).abs() < 1e-4 || t.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn overlap_cosine_is_bounded(
        a in prop::collection::vec(-1.0f32..1.0, 1..32),
        b in prop::collection::vec(-1.0f32..1.0, 1..32),
    ) {
        let c = overlap_cosine(&a, &b);
        prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&c));
    }

    #[test]
    fn token_estimate_is_monotone_in_length(s in "[a-z ]{0,200}", extra in "[a-z]{1,20}") {
        let longer = format!("{s}{extra}");
        prop_assert!(estimate_tokens(&longer, 4) >= estimate_tokens(&s, 4));
    }
}
