// SPDX-License-Identifier: MIT OR Apache-2.0

//! Evaluation harness: drives a score reducer, the degeneracy filter, and
//! the consensus clusterer across a grid of (ratio threshold, window length)
//! configurations and all sliding window positions, accumulating confusion
//! counts per scenario.

#![forbid(unsafe_code)]

pub mod metrics;

use std::borrow::Cow;
use std::time::Instant;

use mvv_consensus::{ConsensusClusterer, DegeneracyFilter, Detection, LinkageMethod};
use mvv_core::{
    BudgetStatus, FeedSegment, MvvError, Recording, Scenario, SweepContext, SweepDiagnostics,
    NUM_FEEDS,
};
use mvv_reduce::ScoreReducer;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

pub use metrics::{
    AggregateRates, MetricsAggregator, RateSummary, ScenarioHitRate, VerdictAggregator,
    RATE_EPSILON,
};

/// Evaluation drive mode.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvalMode {
    /// One detection pass per scenario over the full recording.
    WholeSequence,
    /// Grid sweep over thresholds, window lengths, and window starts.
    #[default]
    SlidingWindow,
}

/// Ground-truth labeling rule for a window against the forged interval.
///
/// `NonOverlap` is the historical rule: a window counts as fake when it does
/// not touch the annotated interval. It matches captures laid out with the
/// authentic take in the middle of the recording and forged content on both
/// sides. `Overlap` is the direct reading for captures where the annotated
/// interval itself holds the forged content.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LabelPolarity {
    #[default]
    NonOverlap,
    Overlap,
}

impl LabelPolarity {
    /// Whether the window `[start, start + len)` is labeled fake against the
    /// ground-truth interval `[interval.0, interval.1)`.
    pub fn window_is_fake(self, start: usize, len: usize, interval: (usize, usize)) -> bool {
        let overlaps = start < interval.1 && start + len > interval.0;
        match self {
            LabelPolarity::NonOverlap => !overlaps,
            LabelPolarity::Overlap => overlaps,
        }
    }
}

/// Classification of one window under one scenario.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    TruePositive,
    TrueNegative,
    FalsePositive,
    FalseNegative,
}

/// Confusion tallies for one (threshold, window length, scenario) cell.
///
/// `excluded` counts windows that could not be determined: degenerate or
/// undersized windows, numerical failures, and per-window budget exhaustion.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positives: u64,
    pub true_negatives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub excluded: u64,
}

impl ConfusionCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::TruePositive => self.true_positives += 1,
            Outcome::TrueNegative => self.true_negatives += 1,
            Outcome::FalsePositive => self.false_positives += 1,
            Outcome::FalseNegative => self.false_negatives += 1,
        }
    }

    /// Determined windows, excluding the undetermined tally.
    pub fn total(&self) -> u64 {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    pub fn merge(&mut self, other: &ConfusionCounts) {
        self.true_positives += other.true_positives;
        self.true_negatives += other.true_negatives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.excluded += other.excluded;
    }
}

/// Whether a detected partition isolates exactly the scenario's substituted
/// feeds, up to swapping the two cluster labels.
fn partition_matches(partition: &[bool], swap_set: &[usize]) -> bool {
    let flagged: Vec<usize> = partition
        .iter()
        .enumerate()
        .filter_map(|(feed, &is_fake)| is_fake.then_some(feed))
        .collect();
    if flagged == swap_set {
        return true;
    }
    let unflagged: Vec<usize> = partition
        .iter()
        .enumerate()
        .filter_map(|(feed, &is_fake)| (!is_fake).then_some(feed))
        .collect();
    unflagged == swap_set
}

/// Maps one detection plus the window's ground-truth label to an outcome.
///
/// `Baseline` has no true fake to match, so it only distinguishes alarm
/// (false positive) from no alarm (true negative). For the hypotheses, only
/// the exact count with the exactly matching partition on a fake-labeled
/// window yields a true positive; a correct count with the wrong split is a
/// miss, and every other nonzero count is an alarm on clean content.
pub fn classify(scenario: Scenario, detection: &Detection, window_fake: bool) -> Outcome {
    if scenario == Scenario::Baseline {
        return if detection.fake_count == 0 {
            Outcome::TrueNegative
        } else {
            Outcome::FalsePositive
        };
    }

    let expected = scenario.fake_count();
    if detection.fake_count == 0 {
        return if window_fake {
            Outcome::FalseNegative
        } else {
            Outcome::TrueNegative
        };
    }
    if detection.fake_count != expected {
        return Outcome::FalsePositive;
    }
    if !window_fake {
        return Outcome::FalsePositive;
    }
    let matched = detection
        .partition
        .as_deref()
        .is_some_and(|partition| partition_matches(partition, scenario.swap_set()));
    if matched {
        Outcome::TruePositive
    } else {
        Outcome::FalseNegative
    }
}

/// Grid and policy configuration for a sweep.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct EvalConfig {
    /// Linkage-ratio thresholds to evaluate.
    pub thresholds: Vec<f64>,
    /// Window lengths in frames.
    pub window_sizes: Vec<usize>,
    /// Step between consecutive window starts.
    pub stride: usize,
    /// Saturation cutoff applied to baseline score columns.
    pub degeneracy_threshold: f64,
    pub polarity: LabelPolarity,
    pub linkage: LinkageMethod,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![1.3, 1.5],
            window_sizes: vec![200, 250],
            stride: 1,
            degeneracy_threshold: mvv_consensus::DEFAULT_DEGENERACY_THRESHOLD,
            polarity: LabelPolarity::default(),
            linkage: LinkageMethod::default(),
        }
    }
}

impl EvalConfig {
    pub fn validate(&self) -> Result<(), MvvError> {
        for &threshold in &self.thresholds {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(MvvError::invalid_input(format!(
                    "thresholds must be finite and positive, got {threshold}"
                )));
            }
        }
        for &window in &self.window_sizes {
            if window == 0 {
                return Err(MvvError::invalid_input("window sizes must be nonzero"));
            }
        }
        if self.stride == 0 {
            return Err(MvvError::invalid_input("stride must be at least 1"));
        }
        Ok(())
    }
}

/// One grid cell's accumulated counts.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SweepCell {
    pub threshold: f64,
    pub window_len: usize,
    pub scenario: Scenario,
    pub counts: ConfusionCounts,
}

/// Full grid sweep output for one participant.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SweepResult {
    pub cells: Vec<SweepCell>,
    pub diagnostics: SweepDiagnostics,
}

/// Whole-sequence pass result for one (threshold, scenario) pair.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioVerdict {
    pub threshold: f64,
    pub scenario: Scenario,
    pub fake_count: usize,
    pub partition: Option<Vec<bool>>,
    /// Exact detected count and, for the hypotheses, exact partition.
    pub hit: bool,
}

/// Output of [`WindowEvaluator::run`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum EvalOutput {
    Sweep(SweepResult),
    Verify(Vec<ScenarioVerdict>),
}

enum WindowEval {
    Classified([Outcome; 4]),
    Undetermined,
}

/// Drives reduction, filtering, and consensus over a recording.
pub struct WindowEvaluator<R> {
    reducer: R,
    config: EvalConfig,
    filter: DegeneracyFilter,
    clusterer: ConsensusClusterer,
}

impl<R: ScoreReducer + Sync> WindowEvaluator<R> {
    pub fn new(reducer: R, config: EvalConfig) -> Result<Self, MvvError> {
        config.validate()?;
        let filter = DegeneracyFilter::new(config.degeneracy_threshold)?;
        let clusterer = ConsensusClusterer::new(config.linkage);
        Ok(Self {
            reducer,
            config,
            filter,
            clusterer,
        })
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn reducer(&self) -> &R {
        &self.reducer
    }

    /// Dispatches on the evaluation mode.
    pub fn run(
        &self,
        mode: EvalMode,
        recording: &Recording,
        ctx: &SweepContext<'_>,
    ) -> Result<EvalOutput, MvvError> {
        match mode {
            EvalMode::SlidingWindow => self.sweep(recording, ctx).map(EvalOutput::Sweep),
            EvalMode::WholeSequence => self.verify(recording, ctx).map(EvalOutput::Verify),
        }
    }

    /// Runs the sliding-window grid sweep.
    ///
    /// Each (threshold, window length) cell owns its accumulators; cells are
    /// evaluated independently and merged afterwards. Empty threshold or
    /// window grids produce an empty result set.
    pub fn sweep(
        &self,
        recording: &Recording,
        ctx: &SweepContext<'_>,
    ) -> Result<SweepResult, MvvError> {
        let started_at = Instant::now();
        let mut diagnostics = SweepDiagnostics {
            frames: recording.frames(),
            dims: recording.dims(),
            participants: 1,
            reducer: Cow::Borrowed(self.reducer.label()),
            ..SweepDiagnostics::default()
        };
        diagnostics.notes.push(format!(
            "grid={}x{}",
            self.config.thresholds.len(),
            self.config.window_sizes.len()
        ));

        let mut grid = Vec::with_capacity(self.config.thresholds.len() * self.config.window_sizes.len());
        for &threshold in &self.config.thresholds {
            for &window_len in &self.config.window_sizes {
                grid.push((threshold, window_len));
            }
        }
        if grid.is_empty() {
            diagnostics.runtime_ms = Some(runtime_ms(started_at));
            return Ok(SweepResult {
                cells: vec![],
                diagnostics,
            });
        }

        #[cfg(feature = "rayon")]
        let cell_results: Vec<(Vec<SweepCell>, SweepDiagnostics)> = if can_use_parallel(ctx) {
            grid.par_iter()
                .map(|&(threshold, window_len)| {
                    self.evaluate_cell(recording, ctx, started_at, threshold, window_len)
                })
                .collect::<Result<Vec<_>, MvvError>>()?
        } else {
            self.evaluate_cells_sequential(recording, ctx, started_at, &grid)?
        };
        #[cfg(not(feature = "rayon"))]
        let cell_results = self.evaluate_cells_sequential(recording, ctx, started_at, &grid)?;

        let mut cells = Vec::with_capacity(cell_results.len() * Scenario::ALL.len());
        for (cell, cell_diagnostics) in cell_results {
            cells.extend(cell);
            diagnostics.merge(cell_diagnostics);
        }
        diagnostics.runtime_ms = Some(runtime_ms(started_at));
        Ok(SweepResult { cells, diagnostics })
    }

    fn evaluate_cells_sequential(
        &self,
        recording: &Recording,
        ctx: &SweepContext<'_>,
        started_at: Instant,
        grid: &[(f64, usize)],
    ) -> Result<Vec<(Vec<SweepCell>, SweepDiagnostics)>, MvvError> {
        grid.iter()
            .map(|&(threshold, window_len)| {
                self.evaluate_cell(recording, ctx, started_at, threshold, window_len)
            })
            .collect()
    }

    fn evaluate_cell(
        &self,
        recording: &Recording,
        ctx: &SweepContext<'_>,
        started_at: Instant,
        threshold: f64,
        window_len: usize,
    ) -> Result<(Vec<SweepCell>, SweepDiagnostics), MvvError> {
        let frames = recording.frames();
        let mut counts = [ConfusionCounts::default(); 4];
        let mut diagnostics = SweepDiagnostics {
            cells_evaluated: 1,
            ..SweepDiagnostics::default()
        };

        let starts: Vec<usize> = (0..frames.saturating_sub(window_len))
            .step_by(self.config.stride)
            .collect();
        for (iteration, &start) in starts.iter().enumerate() {
            ctx.check_cancelled_every(iteration, 16)?;
            if ctx.check_time_budget(started_at)? == BudgetStatus::ExceededSoftDegrade {
                let remaining = (starts.len() - iteration) as u64;
                for cell_counts in &mut counts {
                    cell_counts.excluded += remaining;
                }
                diagnostics.windows_excluded += remaining as usize;
                diagnostics.soft_budget_exceeded = true;
                diagnostics
                    .warnings
                    .push(format!("time budget exceeded; {remaining} windows excluded"));
                break;
            }

            match self.evaluate_window(recording, ctx, start, window_len, threshold) {
                Ok(WindowEval::Classified(outcomes)) => {
                    diagnostics.windows_evaluated += 1;
                    for (cell_counts, outcome) in counts.iter_mut().zip(outcomes) {
                        cell_counts.record(outcome);
                    }
                }
                Ok(WindowEval::Undetermined) => {
                    diagnostics.windows_excluded += 1;
                    diagnostics.soft_budget_exceeded = true;
                    for cell_counts in &mut counts {
                        cell_counts.excluded += 1;
                    }
                }
                Err(err) if err.is_window_scoped() => {
                    diagnostics.windows_excluded += 1;
                    for cell_counts in &mut counts {
                        cell_counts.excluded += 1;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        let cells = Scenario::ALL
            .iter()
            .zip(counts)
            .map(|(&scenario, cell_counts)| SweepCell {
                threshold,
                window_len,
                scenario,
                counts: cell_counts,
            })
            .collect();
        Ok((cells, diagnostics))
    }

    /// Evaluates one window across all four scenarios.
    ///
    /// The degeneracy mask is derived from the all-authentic matrix and
    /// shared by the hypotheses so column indexing stays aligned.
    fn evaluate_window(
        &self,
        recording: &Recording,
        ctx: &SweepContext<'_>,
        start: usize,
        window_len: usize,
        threshold: f64,
    ) -> Result<WindowEval, MvvError> {
        let window_started_at = Instant::now();
        let end = start + window_len;

        let mut baseline_feeds = Vec::with_capacity(NUM_FEEDS);
        for feed in 0..NUM_FEEDS {
            baseline_feeds.push(recording.authentic(feed).segment(start, end)?);
        }
        let baseline = self.reducer.reduce(&baseline_feeds)?;
        if ctx.check_window_budget(window_started_at)? == BudgetStatus::ExceededSoftDegrade {
            return Ok(WindowEval::Undetermined);
        }

        let mut hypotheses = Vec::with_capacity(Scenario::HYPOTHESES.len());
        for scenario in Scenario::HYPOTHESES {
            // Each swapped camera carries its own forged stream.
            let feeds: Vec<FeedSegment<'_>> = (0..NUM_FEEDS)
                .map(|feed| {
                    if scenario.swap_set().contains(&feed) {
                        recording.forged_for_feed(feed)?.segment(start, end)
                    } else {
                        Ok(baseline_feeds[feed])
                    }
                })
                .collect::<Result<_, MvvError>>()?;
            hypotheses.push(self.reducer.reduce(&feeds)?);
            if ctx.check_window_budget(window_started_at)? == BudgetStatus::ExceededSoftDegrade {
                return Ok(WindowEval::Undetermined);
            }
        }

        let (baseline, hypotheses) = self.filter.apply(&baseline, &hypotheses)?;
        let window_fake = self
            .config
            .polarity
            .window_is_fake(start, window_len, recording.fake_interval());

        let baseline_detection = self.clusterer.detect(&baseline, threshold)?;
        let mut outcomes = [Outcome::TrueNegative; 4];
        outcomes[0] = classify(Scenario::Baseline, &baseline_detection, window_fake);
        for (index, scenario) in Scenario::HYPOTHESES.into_iter().enumerate() {
            let detection = self.clusterer.detect(&hypotheses[index], threshold)?;
            outcomes[index + 1] = classify(scenario, &detection, window_fake);
        }
        Ok(WindowEval::Classified(outcomes))
    }

    /// Runs one detection pass per scenario over the full recording.
    ///
    /// A hypothesis verdict is a hit when the detected count equals the
    /// scenario's and the partition isolates exactly the substituted feeds;
    /// the baseline verdict is a hit when no alarm is raised.
    pub fn verify(
        &self,
        recording: &Recording,
        ctx: &SweepContext<'_>,
    ) -> Result<Vec<ScenarioVerdict>, MvvError> {
        ctx.check_cancelled()?;
        let frames = recording.frames();

        let mut baseline_feeds = Vec::with_capacity(NUM_FEEDS);
        for feed in 0..NUM_FEEDS {
            baseline_feeds.push(recording.authentic(feed).segment(0, frames)?);
        }
        let baseline = self.reducer.reduce(&baseline_feeds)?;

        let mut hypotheses = Vec::with_capacity(Scenario::HYPOTHESES.len());
        for scenario in Scenario::HYPOTHESES {
            ctx.check_cancelled()?;
            let feeds: Vec<FeedSegment<'_>> = (0..NUM_FEEDS)
                .map(|feed| {
                    if scenario.swap_set().contains(&feed) {
                        recording.forged_for_feed(feed)?.segment(0, frames)
                    } else {
                        Ok(baseline_feeds[feed])
                    }
                })
                .collect::<Result<_, MvvError>>()?;
            hypotheses.push(self.reducer.reduce(&feeds)?);
        }
        let (baseline, hypotheses) = self.filter.apply(&baseline, &hypotheses)?;

        let mut verdicts = Vec::with_capacity(self.config.thresholds.len() * Scenario::ALL.len());
        for &threshold in &self.config.thresholds {
            ctx.check_cancelled()?;
            let detection = self.clusterer.detect(&baseline, threshold)?;
            verdicts.push(ScenarioVerdict {
                threshold,
                scenario: Scenario::Baseline,
                hit: detection.fake_count == 0,
                fake_count: detection.fake_count,
                partition: detection.partition,
            });
            for (index, scenario) in Scenario::HYPOTHESES.into_iter().enumerate() {
                let detection = self.clusterer.detect(&hypotheses[index], threshold)?;
                let hit = detection.fake_count == scenario.fake_count()
                    && detection
                        .partition
                        .as_deref()
                        .is_some_and(|partition| partition_matches(partition, scenario.swap_set()));
                verdicts.push(ScenarioVerdict {
                    threshold,
                    scenario,
                    hit,
                    fake_count: detection.fake_count,
                    partition: detection.partition,
                });
            }
        }
        Ok(verdicts)
    }
}

fn runtime_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(feature = "rayon")]
fn can_use_parallel(ctx: &SweepContext<'_>) -> bool {
    ctx.cancel.is_none()
        && ctx.constraints.time_budget_ms.is_none()
        && ctx.constraints.window_time_budget_ms.is_none()
}

/// Crate name for diagnostics.
pub fn crate_name() -> &'static str {
    "mvv-eval"
}

#[cfg(test)]
mod tests {
    use super::{
        classify, ConfusionCounts, EvalConfig, LabelPolarity, Outcome, SweepResult,
        WindowEvaluator,
    };
    use mvv_consensus::Detection;
    use mvv_core::{
        CancelToken, Constraints, FeedMatrix, Recording, Scenario, SweepContext, NUM_FEEDS,
        NUM_VARIANTS,
    };
    use mvv_reduce::{McdConfig, PcaMahalanobis, PcaMahalanobisConfig};

    fn detection(fake_count: usize, partition: Option<Vec<bool>>) -> Detection {
        Detection {
            fake_count,
            partition,
        }
    }

    fn flags(fakes: &[usize]) -> Vec<bool> {
        let mut partition = vec![false; NUM_FEEDS];
        for &feed in fakes {
            partition[feed] = true;
        }
        partition
    }

    #[test]
    fn polarity_labels_are_mirror_images() {
        let interval = (300, 600);
        for (start, len) in [(0, 250), (100, 250), (300, 200), (550, 100), (600, 200)] {
            let overlap = LabelPolarity::Overlap.window_is_fake(start, len, interval);
            let non_overlap = LabelPolarity::NonOverlap.window_is_fake(start, len, interval);
            assert_ne!(overlap, non_overlap);
        }
        assert!(LabelPolarity::Overlap.window_is_fake(299, 2, interval));
        assert!(!LabelPolarity::Overlap.window_is_fake(100, 200, interval));
        assert!(!LabelPolarity::Overlap.window_is_fake(600, 100, interval));
    }

    #[test]
    fn baseline_classifies_alarm_versus_no_alarm_only() {
        let quiet = detection(0, None);
        let noisy = detection(2, Some(flags(&[2, 3])));
        for window_fake in [false, true] {
            assert_eq!(
                classify(Scenario::Baseline, &quiet, window_fake),
                Outcome::TrueNegative
            );
            assert_eq!(
                classify(Scenario::Baseline, &noisy, window_fake),
                Outcome::FalsePositive
            );
        }
    }

    #[test]
    fn exact_count_and_partition_on_fake_window_is_true_positive() {
        let hit = detection(2, Some(flags(&[2, 3])));
        assert_eq!(
            classify(Scenario::TwoFakes, &hit, true),
            Outcome::TruePositive
        );
    }

    #[test]
    fn correct_count_with_wrong_partition_is_false_negative() {
        let wrong_split = detection(2, Some(flags(&[1, 4])));
        assert_eq!(
            classify(Scenario::TwoFakes, &wrong_split, true),
            Outcome::FalseNegative
        );
    }

    #[test]
    fn correct_count_on_clean_window_is_false_positive() {
        let hit = detection(1, Some(flags(&[3])));
        assert_eq!(
            classify(Scenario::OneFake, &hit, false),
            Outcome::FalsePositive
        );
    }

    #[test]
    fn wrong_nonzero_count_is_false_positive_either_way() {
        let wrong = detection(3, Some(flags(&[1, 2, 3])));
        for window_fake in [false, true] {
            assert_eq!(
                classify(Scenario::OneFake, &wrong, window_fake),
                Outcome::FalsePositive
            );
        }
    }

    #[test]
    fn silent_detector_splits_on_window_label() {
        let quiet = detection(0, None);
        assert_eq!(
            classify(Scenario::ThreeFakes, &quiet, true),
            Outcome::FalseNegative
        );
        assert_eq!(
            classify(Scenario::ThreeFakes, &quiet, false),
            Outcome::TrueNegative
        );
    }

    #[test]
    fn label_swapped_partition_still_matches_for_three_fakes() {
        // Flagging the complement of {1, 2, 3} is the same two-way split
        // with the cluster labels exchanged.
        let swapped = detection(3, Some(flags(&[0, 4, 5])));
        assert_eq!(
            classify(Scenario::ThreeFakes, &swapped, true),
            Outcome::TruePositive
        );
    }

    #[test]
    fn confusion_counts_record_and_merge() {
        let mut counts = ConfusionCounts::default();
        counts.record(Outcome::TruePositive);
        counts.record(Outcome::TrueNegative);
        counts.record(Outcome::TrueNegative);
        counts.record(Outcome::FalseNegative);
        assert_eq!(counts.total(), 4);

        let other = ConfusionCounts {
            false_positives: 2,
            excluded: 1,
            ..ConfusionCounts::default()
        };
        counts.merge(&other);
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.excluded, 1);
    }

    fn sample(feed: usize, frame: usize, dim: usize) -> f64 {
        let phase = 0.11 * frame as f64 * (dim + 1) as f64;
        let mut state = (frame as u64)
            .wrapping_mul(0x9e37_79b9_7f4a_7c15)
            .wrapping_add(dim as u64)
            .wrapping_add((feed as u64) << 32);
        state ^= state >> 31;
        state = state.wrapping_mul(0xd6e8_feb8_6659_fd93);
        state ^= state >> 29;
        let noise = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
        phase.sin() + 0.6 * noise
    }

    fn small_recording(frames: usize, dims: usize) -> Recording {
        let feed_matrix = |feed: usize| {
            let mut data = Vec::with_capacity(frames * dims);
            for frame in 0..frames {
                for dim in 0..dims {
                    data.push(sample(feed, frame, dim));
                }
            }
            FeedMatrix::new(data, frames, dims).expect("test feed should be valid")
        };
        let authentic: Vec<FeedMatrix> = (0..NUM_FEEDS).map(feed_matrix).collect();
        let forged: Vec<FeedMatrix> = (0..NUM_VARIANTS)
            .map(|variant| feed_matrix(NUM_FEEDS + variant))
            .collect();
        Recording::new(authentic, forged, frames / 3, 2 * frames / 3)
            .expect("test recording should be valid")
    }

    fn small_reducer() -> PcaMahalanobis {
        PcaMahalanobis::new(PcaMahalanobisConfig {
            num_components: 2,
            mcd: McdConfig {
                num_starts: 4,
                ..McdConfig::default()
            },
        })
        .expect("reducer config should be valid")
    }

    fn small_config(window: usize) -> EvalConfig {
        EvalConfig {
            thresholds: vec![1.5],
            window_sizes: vec![window],
            stride: 8,
            ..EvalConfig::default()
        }
    }

    #[test]
    fn empty_grids_produce_empty_results() {
        let recording = small_recording(48, 3);
        let constraints = Constraints::default();
        let ctx = SweepContext::new(&constraints);

        for config in [
            EvalConfig {
                thresholds: vec![],
                ..small_config(16)
            },
            EvalConfig {
                window_sizes: vec![],
                ..small_config(16)
            },
        ] {
            let evaluator =
                WindowEvaluator::new(small_reducer(), config).expect("config should be valid");
            let result = evaluator
                .sweep(&recording, &ctx)
                .expect("empty grid should not error");
            assert!(result.cells.is_empty());
            assert_eq!(result.diagnostics.cells_evaluated, 0);
        }
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad_threshold = EvalConfig {
            thresholds: vec![1.3, -2.0],
            ..EvalConfig::default()
        };
        assert!(bad_threshold.validate().is_err());

        let bad_window = EvalConfig {
            window_sizes: vec![200, 0],
            ..EvalConfig::default()
        };
        assert!(bad_window.validate().is_err());

        let bad_stride = EvalConfig {
            stride: 0,
            ..EvalConfig::default()
        };
        assert!(bad_stride.validate().is_err());
    }

    #[test]
    fn fired_cancel_token_aborts_the_sweep() {
        let recording = small_recording(48, 3);
        let constraints = Constraints::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = SweepContext::new(&constraints).with_cancel(&cancel);

        let evaluator = WindowEvaluator::new(small_reducer(), small_config(16))
            .expect("config should be valid");
        let err = evaluator
            .sweep(&recording, &ctx)
            .expect_err("cancelled sweep should error");
        assert_eq!(err.to_string(), "cancelled");
    }

    #[test]
    fn undersized_windows_are_excluded_not_fatal() {
        let recording = small_recording(48, 3);
        let constraints = Constraints::default();
        let ctx = SweepContext::new(&constraints);

        // Two frames per window cannot support a two-component projection,
        // so every window is undetermined.
        let evaluator = WindowEvaluator::new(small_reducer(), small_config(2))
            .expect("config should be valid");
        let result = evaluator.sweep(&recording, &ctx).expect("sweep should run");

        assert_eq!(result.diagnostics.windows_evaluated, 0);
        assert!(result.diagnostics.windows_excluded > 0);
        for cell in &result.cells {
            assert_eq!(cell.counts.total(), 0);
            assert_eq!(
                cell.counts.excluded as usize,
                result.diagnostics.windows_excluded
            );
        }
    }

    #[test]
    fn sweep_is_deterministic_for_fixed_input() {
        let recording = small_recording(48, 3);
        let constraints = Constraints::default();
        let ctx = SweepContext::new(&constraints);
        let evaluator = WindowEvaluator::new(small_reducer(), small_config(16))
            .expect("config should be valid");

        let first: SweepResult = evaluator.sweep(&recording, &ctx).expect("first sweep");
        let second: SweepResult = evaluator.sweep(&recording, &ctx).expect("second sweep");
        assert_eq!(first.cells, second.cells);
    }

    #[test]
    fn sweep_emits_one_cell_per_scenario_per_grid_point() {
        let recording = small_recording(48, 3);
        let constraints = Constraints::default();
        let ctx = SweepContext::new(&constraints);
        let config = EvalConfig {
            thresholds: vec![1.3, 1.5],
            window_sizes: vec![16, 24],
            stride: 8,
            ..EvalConfig::default()
        };
        let evaluator =
            WindowEvaluator::new(small_reducer(), config).expect("config should be valid");

        let result = evaluator.sweep(&recording, &ctx).expect("sweep should run");
        assert_eq!(result.cells.len(), 2 * 2 * Scenario::ALL.len());
        assert_eq!(result.diagnostics.cells_evaluated, 4);
        assert_eq!(result.diagnostics.reducer, "pca-mahalanobis");
    }
}
