// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use mvv_core::Scenario;

use crate::{ConfusionCounts, ScenarioVerdict, SweepResult};

/// Guard against zero denominators in rate computation.
pub const RATE_EPSILON: f64 = 1e-7;

impl ConfusionCounts {
    /// True-positive rate, `tp / (tp + fn + eps)`.
    pub fn tpr(&self) -> f64 {
        self.true_positives as f64
            / (self.true_positives as f64 + self.false_negatives as f64 + RATE_EPSILON)
    }

    /// False-positive rate, `fp / (fp + tn + eps)`.
    pub fn fpr(&self) -> f64 {
        self.false_positives as f64
            / (self.false_positives as f64 + self.true_negatives as f64 + RATE_EPSILON)
    }

    /// Fraction of determined windows classified correctly.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_positives + self.true_negatives) as f64 / total as f64
    }
}

/// Derived rates for one participant's cell.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateSummary {
    pub tpr: f64,
    pub fpr: f64,
    pub accuracy: f64,
}

impl RateSummary {
    pub fn from_counts(counts: &ConfusionCounts) -> Self {
        Self {
            tpr: counts.tpr(),
            fpr: counts.fpr(),
            accuracy: counts.accuracy(),
        }
    }
}

/// Mean and population standard deviation of rates across participants for
/// one (threshold, window length, scenario) configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateRates {
    pub threshold: f64,
    pub window_len: usize,
    pub scenario: Scenario,
    pub participants: usize,
    pub tpr_mean: f64,
    pub tpr_std: f64,
    pub fpr_mean: f64,
    pub fpr_std: f64,
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
}

/// Collects per-participant sweep results and reduces them to per-cell
/// rate statistics.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    // Keyed by (threshold bits, window length, fake count); thresholds are
    // validated positive upstream, so the bit order matches numeric order.
    groups: BTreeMap<(u64, usize, usize), Vec<RateSummary>>,
    participants: usize,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Folds one participant's sweep into the aggregate.
    pub fn add_participant(&mut self, result: &SweepResult) {
        self.participants += 1;
        for cell in &result.cells {
            let key = (
                cell.threshold.to_bits(),
                cell.window_len,
                cell.scenario.fake_count(),
            );
            self.groups
                .entry(key)
                .or_default()
                .push(RateSummary::from_counts(&cell.counts));
        }
    }

    /// Per-configuration means and standard deviations, in ascending
    /// (threshold, window length, scenario) order.
    pub fn summarize(&self) -> Vec<AggregateRates> {
        self.groups
            .iter()
            .map(|(&(threshold_bits, window_len, fake_count), rates)| {
                let (tpr_mean, tpr_std) = mean_std(rates.iter().map(|r| r.tpr));
                let (fpr_mean, fpr_std) = mean_std(rates.iter().map(|r| r.fpr));
                let (accuracy_mean, accuracy_std) = mean_std(rates.iter().map(|r| r.accuracy));
                AggregateRates {
                    threshold: f64::from_bits(threshold_bits),
                    window_len,
                    scenario: Scenario::from_fake_count(fake_count)
                        .unwrap_or(Scenario::Baseline),
                    participants: rates.len(),
                    tpr_mean,
                    tpr_std,
                    fpr_mean,
                    fpr_std,
                    accuracy_mean,
                    accuracy_std,
                }
            })
            .collect()
    }
}

/// Hit-rate statistics for one (threshold, scenario) pair across
/// participants in whole-sequence mode.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioHitRate {
    pub threshold: f64,
    pub scenario: Scenario,
    pub participants: usize,
    pub hit_rate_mean: f64,
    pub hit_rate_std: f64,
}

/// Collects per-participant whole-sequence verdicts and reduces them to
/// per-scenario hit rates.
#[derive(Debug, Default)]
pub struct VerdictAggregator {
    // Keyed by (threshold bits, fake count); thresholds are validated
    // positive upstream, so the bit order matches numeric order.
    groups: BTreeMap<(u64, usize), Vec<f64>>,
    participants: usize,
}

impl VerdictAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Folds one participant's verdicts into the aggregate. A hit counts
    /// as 1.0, a miss as 0.0.
    pub fn add_participant(&mut self, verdicts: &[ScenarioVerdict]) {
        self.participants += 1;
        for verdict in verdicts {
            let key = (verdict.threshold.to_bits(), verdict.scenario.fake_count());
            self.groups
                .entry(key)
                .or_default()
                .push(if verdict.hit { 1.0 } else { 0.0 });
        }
    }

    /// Per-configuration hit rates, in ascending (threshold, scenario)
    /// order.
    pub fn summarize(&self) -> Vec<ScenarioHitRate> {
        self.groups
            .iter()
            .map(|(&(threshold_bits, fake_count), hits)| {
                let (hit_rate_mean, hit_rate_std) = mean_std(hits.iter().copied());
                ScenarioHitRate {
                    threshold: f64::from_bits(threshold_bits),
                    scenario: Scenario::from_fake_count(fake_count)
                        .unwrap_or(Scenario::Baseline),
                    participants: hits.len(),
                    hit_rate_mean,
                    hit_rate_std,
                }
            })
            .collect()
    }
}

fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let variance = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    (mean, variance.sqrt())
}
