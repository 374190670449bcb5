// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::borrow::Cow;

/// Diagnostics schema version for sweep run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured from a sweep execution.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SweepDiagnostics {
    pub frames: usize,
    pub dims: usize,
    pub participants: usize,
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub runtime_ms: Option<u64>,
    pub reducer: Cow<'static, str>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub cells_evaluated: usize,
    pub windows_evaluated: usize,
    pub windows_excluded: usize,
    pub soft_budget_exceeded: bool,
}

impl Default for SweepDiagnostics {
    fn default() -> Self {
        Self {
            frames: 0,
            dims: 0,
            participants: 0,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: None,
            reducer: Cow::Borrowed(""),
            notes: vec![],
            warnings: vec![],
            cells_evaluated: 0,
            windows_evaluated: 0,
            windows_excluded: 0,
            soft_budget_exceeded: false,
        }
    }
}

impl SweepDiagnostics {
    /// Folds another diagnostics record into this one.
    ///
    /// Counters add; notes and warnings concatenate; the soft-degrade flag
    /// is sticky.
    pub fn merge(&mut self, other: SweepDiagnostics) {
        self.cells_evaluated += other.cells_evaluated;
        self.windows_evaluated += other.windows_evaluated;
        self.windows_excluded += other.windows_excluded;
        self.soft_budget_exceeded |= other.soft_budget_exceeded;
        self.notes.extend(other.notes);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::{SweepDiagnostics, DIAGNOSTICS_SCHEMA_VERSION};

    #[test]
    fn default_sets_schema_and_engine_version() {
        let diagnostics = SweepDiagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert_eq!(diagnostics.windows_excluded, 0);
        assert!(!diagnostics.soft_budget_exceeded);
    }

    #[test]
    fn merge_adds_counters_and_keeps_sticky_flags() {
        let mut left = SweepDiagnostics {
            cells_evaluated: 2,
            windows_evaluated: 40,
            windows_excluded: 1,
            notes: vec!["left".to_string()],
            ..SweepDiagnostics::default()
        };
        let right = SweepDiagnostics {
            cells_evaluated: 3,
            windows_evaluated: 60,
            windows_excluded: 4,
            soft_budget_exceeded: true,
            notes: vec!["right".to_string()],
            warnings: vec!["slow window".to_string()],
            ..SweepDiagnostics::default()
        };

        left.merge(right);
        assert_eq!(left.cells_evaluated, 5);
        assert_eq!(left.windows_evaluated, 100);
        assert_eq!(left.windows_excluded, 5);
        assert!(left.soft_budget_exceeded);
        assert_eq!(left.notes, vec!["left".to_string(), "right".to_string()]);
        assert_eq!(left.warnings, vec!["slow window".to_string()]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn diagnostics_serde_roundtrip_preserves_all_fields() {
        let diagnostics = SweepDiagnostics {
            frames: 900,
            dims: 40,
            participants: 24,
            runtime_ms: Some(1250),
            reducer: std::borrow::Cow::Borrowed("pca-mahalanobis"),
            notes: vec!["grid=2x2".to_string()],
            warnings: vec![],
            cells_evaluated: 4,
            windows_evaluated: 2600,
            windows_excluded: 12,
            soft_budget_exceeded: false,
            ..SweepDiagnostics::default()
        };

        let encoded = serde_json::to_string(&diagnostics).expect("diagnostics should serialize");
        let decoded: SweepDiagnostics =
            serde_json::from_str(&encoded).expect("diagnostics should deserialize");
        assert_eq!(decoded, diagnostics);
    }
}
