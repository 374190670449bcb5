// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Substitution hypothesis: exactly `fake_count` specific feeds are forged.
///
/// The substituted subsets are fixed per count and nested:
/// {3} ⊂ {2, 3} ⊂ {1, 2, 3} (zero-based feed indices).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// All six feeds authentic.
    Baseline,
    /// Feed 3 substituted.
    OneFake,
    /// Feeds 2 and 3 substituted.
    TwoFakes,
    /// Feeds 1, 2, and 3 substituted.
    ThreeFakes,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Baseline,
        Scenario::OneFake,
        Scenario::TwoFakes,
        Scenario::ThreeFakes,
    ];

    /// The three non-baseline hypotheses, in fake-count order.
    pub const HYPOTHESES: [Scenario; 3] =
        [Scenario::OneFake, Scenario::TwoFakes, Scenario::ThreeFakes];

    pub fn fake_count(self) -> usize {
        match self {
            Scenario::Baseline => 0,
            Scenario::OneFake => 1,
            Scenario::TwoFakes => 2,
            Scenario::ThreeFakes => 3,
        }
    }

    /// Zero-based feed indices substituted under this hypothesis.
    pub fn swap_set(self) -> &'static [usize] {
        match self {
            Scenario::Baseline => &[],
            Scenario::OneFake => &[3],
            Scenario::TwoFakes => &[2, 3],
            Scenario::ThreeFakes => &[1, 2, 3],
        }
    }

    pub fn from_fake_count(fake_count: usize) -> Option<Self> {
        match fake_count {
            0 => Some(Scenario::Baseline),
            1 => Some(Scenario::OneFake),
            2 => Some(Scenario::TwoFakes),
            3 => Some(Scenario::ThreeFakes),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Scenario;

    #[test]
    fn fake_counts_match_swap_set_sizes() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.fake_count(), scenario.swap_set().len());
        }
    }

    #[test]
    fn swap_sets_are_nested() {
        for pair in Scenario::ALL.windows(2) {
            let smaller = pair[0].swap_set();
            let larger = pair[1].swap_set();
            assert!(
                smaller.iter().all(|index| larger.contains(index)),
                "{:?} swap set must be contained in {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn from_fake_count_round_trips_and_rejects_out_of_range() {
        for scenario in Scenario::ALL {
            assert_eq!(
                Scenario::from_fake_count(scenario.fake_count()),
                Some(scenario)
            );
        }
        assert_eq!(Scenario::from_fake_count(4), None);
    }
}
