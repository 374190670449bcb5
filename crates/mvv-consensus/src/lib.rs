// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-feed consensus: degeneracy filtering, hierarchical clustering of
//! per-feed score rows, and the linkage-ratio outlier decision.
//!
//! The pipeline feeds a [`mvv_core::ScoreMatrix`] through a
//! [`DegeneracyFilter`] to drop saturated columns, then asks a
//! [`ConsensusClusterer`] whether the tallest merge in the row hierarchy
//! dwarfs the rest. When it does, the tree is cut in two and the minority
//! cluster is reported as the forged group.

#![forbid(unsafe_code)]

mod detect;
mod filter;
mod linkage;

pub use detect::{ConsensusClusterer, Detection};
pub use filter::{DegeneracyFilter, DEFAULT_DEGENERACY_THRESHOLD};
pub use linkage::{linkage, LinkageMethod, LinkageTree, Merge};

/// Crate name for diagnostics.
pub fn crate_name() -> &'static str {
    "mvv-consensus"
}
