// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Unified error type for the mvv workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MvvError {
    /// Caller supplied a shape, range, or configuration that cannot be used.
    InvalidInput(String),
    /// Robust covariance fitting needs more samples than dimensions.
    InsufficientSamples(String),
    /// Degeneracy filtering removed every time column of a window.
    DegenerateWindow(String),
    /// A computation produced a non-finite or otherwise unusable value.
    NumericalIssue(String),
    /// A configured budget (time, cells) was exceeded in hard-fail mode.
    ResourceLimit(String),
    /// Cancellation was requested through a [`crate::CancelToken`].
    Cancelled,
}

impl MvvError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn insufficient_samples(message: impl Into<String>) -> Self {
        Self::InsufficientSamples(message.into())
    }

    pub fn degenerate_window(message: impl Into<String>) -> Self {
        Self::DegenerateWindow(message.into())
    }

    pub fn numerical_issue(message: impl Into<String>) -> Self {
        Self::NumericalIssue(message.into())
    }

    pub fn resource_limit(message: impl Into<String>) -> Self {
        Self::ResourceLimit(message.into())
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }

    /// Returns true when the error is scoped to a single window cell.
    ///
    /// Window-scoped failures mark the cell excluded and the sweep continues;
    /// everything else aborts the run.
    pub fn is_window_scoped(&self) -> bool {
        matches!(
            self,
            Self::InsufficientSamples(_)
                | Self::DegenerateWindow(_)
                | Self::NumericalIssue(_)
                | Self::ResourceLimit(_)
        )
    }
}

impl fmt::Display for MvvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::InsufficientSamples(message) => write!(f, "insufficient samples: {message}"),
            Self::DegenerateWindow(message) => write!(f, "degenerate window: {message}"),
            Self::NumericalIssue(message) => write!(f, "numerical issue: {message}"),
            Self::ResourceLimit(message) => write!(f, "resource limit exceeded: {message}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for MvvError {}
