// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use mvv_consensus::{ConsensusClusterer, DegeneracyFilter, Detection, LinkageMethod};
use mvv_core::{ScoreMatrix, NUM_FEEDS};
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

fn score_matrix_strategy() -> impl Strategy<Value = ScoreMatrix> {
    (2usize..12).prop_flat_map(|cols| {
        prop::collection::vec(
            prop::collection::vec(0.0f64..50.0, cols..=cols),
            NUM_FEEDS..=NUM_FEEDS,
        )
        .prop_map(|rows| ScoreMatrix::from_rows(rows).expect("generated matrix should be valid"))
    })
}

fn detect(matrix: &ScoreMatrix, method: LinkageMethod, threshold: f64) -> Detection {
    ConsensusClusterer::new(method)
        .detect(matrix, threshold)
        .expect("finite scores with a positive threshold should detect")
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn detected_count_is_bounded_and_partition_has_one_flag_per_feed(
        matrix in score_matrix_strategy(),
        threshold in 1.01f64..10.0,
    ) {
        for method in [LinkageMethod::Average, LinkageMethod::Single] {
            let detection = detect(&matrix, method, threshold);
            prop_assert!(detection.fake_count <= NUM_FEEDS);
            match &detection.partition {
                Some(partition) => {
                    prop_assert!(detection.fake_count > 0);
                    prop_assert_eq!(partition.len(), NUM_FEEDS);
                    let flagged = partition.iter().filter(|&&flag| flag).count();
                    prop_assert_eq!(flagged, detection.fake_count);
                    // Minority rule: never more outliers than authentic feeds.
                    prop_assert!(flagged <= NUM_FEEDS / 2);
                }
                None => prop_assert_eq!(detection.fake_count, 0),
            }
        }
    }

    #[test]
    fn raising_the_threshold_never_creates_an_alarm(
        matrix in score_matrix_strategy(),
        low in 1.01f64..5.0,
        bump in 0.1f64..20.0,
    ) {
        let high = low + bump;
        let alarm_low = detect(&matrix, LinkageMethod::Average, low).fake_count > 0;
        let alarm_high = detect(&matrix, LinkageMethod::Average, high).fake_count > 0;
        prop_assert!(
            alarm_low || !alarm_high,
            "alarm at threshold {high} but not at {low}"
        );
    }

    #[test]
    fn detection_is_deterministic(
        matrix in score_matrix_strategy(),
        threshold in 1.01f64..10.0,
    ) {
        let first = detect(&matrix, LinkageMethod::Average, threshold);
        let second = detect(&matrix, LinkageMethod::Average, threshold);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn filter_mask_is_shared_between_baseline_and_hypotheses(
        (mut baseline_rows, hypothesis_rows, spike_col) in (2usize..12).prop_flat_map(|cols| (
            prop::collection::vec(
                prop::collection::vec(0.0f64..9.5, cols..=cols),
                NUM_FEEDS..=NUM_FEEDS,
            ),
            prop::collection::vec(
                prop::collection::vec(0.0f64..50.0, cols..=cols),
                NUM_FEEDS..=NUM_FEEDS,
            ),
            0..cols,
        )),
    ) {
        let cols = baseline_rows[0].len();
        // Exactly one saturated baseline column; it must be dropped from the
        // baseline and the hypothesis alike, regardless of hypothesis values.
        baseline_rows[0][spike_col] = 10.0;
        let baseline = ScoreMatrix::from_rows(baseline_rows).expect("baseline should be valid");
        let hypothesis =
            ScoreMatrix::from_rows(hypothesis_rows).expect("hypothesis should be valid");

        let filter = DegeneracyFilter::default();
        let (filtered_baseline, filtered_hypotheses) = filter
            .apply(&baseline, std::slice::from_ref(&hypothesis))
            .expect("at least one column survives");
        prop_assert_eq!(filtered_baseline.cols(), cols - 1);
        prop_assert_eq!(filtered_hypotheses[0].cols(), cols - 1);
    }
}
