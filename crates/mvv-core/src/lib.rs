// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod control;
pub mod diagnostics;
pub mod error;
pub mod feeds;
pub mod scenario;
pub mod score;

pub use control::{BudgetMode, BudgetStatus, CancelToken, Constraints, SweepContext};
pub use diagnostics::{SweepDiagnostics, DIAGNOSTICS_SCHEMA_VERSION};
pub use error::MvvError;
pub use feeds::{FeedMatrix, FeedSegment, Recording, NUM_FEEDS, NUM_VARIANTS};
pub use scenario::Scenario;
pub use score::ScoreMatrix;

/// Core shared types for mvv-rs.
pub fn crate_name() -> &'static str {
    "mvv-core"
}
