// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use mvv_core::{FeedMatrix, NUM_FEEDS};
use mvv_reduce::{
    McdConfig, PcaMahalanobis, PcaMahalanobisConfig, ScoreReducer, WaveletMahalanobis,
};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn feed_set_strategy() -> impl Strategy<Value = Vec<FeedMatrix>> {
    (24usize..40, 3usize..6).prop_flat_map(|(frames, dims)| {
        prop::collection::vec(-10.0f64..10.0, NUM_FEEDS * frames * dims).prop_map(
            move |values| {
                values
                    .chunks_exact(frames * dims)
                    .map(|chunk| {
                        FeedMatrix::new(chunk.to_vec(), frames, dims)
                            .expect("generated feed should be valid")
                    })
                    .collect()
            },
        )
    })
}

fn pca_reducer() -> PcaMahalanobis {
    PcaMahalanobis::new(PcaMahalanobisConfig {
        num_components: 2,
        mcd: McdConfig {
            num_starts: 4,
            ..McdConfig::default()
        },
    })
    .expect("reducer config should be valid")
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn pca_scores_are_nonnegative_finite_and_deterministic(
        feeds in feed_set_strategy(),
    ) {
        let reducer = pca_reducer();
        let segments: Vec<_> = feeds.iter().map(FeedMatrix::full).collect();

        let first = reducer.reduce(&segments).expect("well-shaped feeds should score");
        prop_assert_eq!(first.rows(), NUM_FEEDS);
        prop_assert_eq!(first.cols(), feeds[0].frames());
        for feed in 0..NUM_FEEDS {
            for &score in first.row(feed) {
                prop_assert!(score.is_finite() && score >= 0.0, "score {score}");
            }
        }

        // The seeded robust fit makes scoring a pure function of its input.
        let second = reducer.reduce(&segments).expect("rescoring should succeed");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn wavelet_reducer_emits_one_nonnegative_score_per_feed(
        feeds in feed_set_strategy(),
    ) {
        let reducer = WaveletMahalanobis::new();
        let segments: Vec<_> = feeds.iter().map(FeedMatrix::full).collect();

        let first = reducer.reduce(&segments).expect("well-shaped feeds should score");
        prop_assert_eq!(first.rows(), NUM_FEEDS);
        prop_assert_eq!(first.cols(), 1);
        for feed in 0..NUM_FEEDS {
            let score = first.get(feed, 0);
            prop_assert!(score.is_finite() && score >= 0.0, "score {score}");
        }

        let second = reducer.reduce(&segments).expect("rescoring should succeed");
        prop_assert_eq!(first, second);
    }
}
