// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::MvvError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cooperative cancellation flag shared across sweep workers.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Budget handling policy when a configured limit is exceeded.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BudgetMode {
    /// Exceeding a budget fails the run with a resource-limit error.
    #[default]
    HardFail,
    /// Exceeding a budget degrades: remaining work is marked excluded.
    SoftDegrade,
}

/// Outcome of a budget check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BudgetStatus {
    WithinBudget,
    ExceededSoftDegrade,
}

/// Resource limits for a sweep.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Constraints {
    /// Wall-clock budget for the whole sweep, in milliseconds.
    pub time_budget_ms: Option<u64>,
    /// Wall-clock budget for a single window evaluation, in milliseconds.
    ///
    /// Robust covariance fitting can stall on near-singular data; a window
    /// that exceeds this budget is recorded as undetermined and excluded.
    pub window_time_budget_ms: Option<u64>,
}

/// Execution context threaded through sweep calls.
pub struct SweepContext<'a> {
    pub constraints: &'a Constraints,
    pub cancel: Option<&'a CancelToken>,
    pub budget_mode: BudgetMode,
}

impl<'a> SweepContext<'a> {
    /// Creates a context with safe defaults and no cancellation hook.
    pub fn new(constraints: &'a Constraints) -> Self {
        Self {
            constraints,
            cancel: None,
            budget_mode: BudgetMode::HardFail,
        }
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_budget_mode(mut self, budget_mode: BudgetMode) -> Self {
        self.budget_mode = budget_mode;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Returns a cancelled error when cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<(), MvvError> {
        if self.is_cancelled() {
            return Err(MvvError::cancelled());
        }
        Ok(())
    }

    /// Checks cancellation every `every` iterations.
    ///
    /// When `every` is zero, it is treated as one (always poll).
    pub fn check_cancelled_every(&self, iteration: usize, every: usize) -> Result<(), MvvError> {
        let every = every.max(1);
        if iteration % every != 0 {
            return Ok(());
        }
        self.check_cancelled()
    }

    /// Checks the whole-sweep time budget against elapsed wall-clock time.
    pub fn check_time_budget(&self, started_at: Instant) -> Result<BudgetStatus, MvvError> {
        self.check_budget_ms(started_at, self.constraints.time_budget_ms, "time_budget_ms")
    }

    /// Checks the per-window time budget against elapsed wall-clock time.
    ///
    /// Always reports soft degradation on exceed: the window is excluded and
    /// the sweep continues regardless of [`BudgetMode`].
    pub fn check_window_budget(&self, window_started_at: Instant) -> Result<BudgetStatus, MvvError> {
        let Some(limit_ms) = self.constraints.window_time_budget_ms else {
            return Ok(BudgetStatus::WithinBudget);
        };
        if window_started_at.elapsed().as_millis() <= u128::from(limit_ms) {
            return Ok(BudgetStatus::WithinBudget);
        }
        Ok(BudgetStatus::ExceededSoftDegrade)
    }

    fn check_budget_ms(
        &self,
        started_at: Instant,
        limit_ms: Option<u64>,
        label: &str,
    ) -> Result<BudgetStatus, MvvError> {
        let Some(limit_ms) = limit_ms else {
            return Ok(BudgetStatus::WithinBudget);
        };

        let elapsed_ms = started_at.elapsed().as_millis();
        if elapsed_ms <= u128::from(limit_ms) {
            return Ok(BudgetStatus::WithinBudget);
        }

        match self.budget_mode {
            BudgetMode::HardFail => Err(MvvError::resource_limit(format!(
                "constraints.{label} exceeded: elapsed_ms={elapsed_ms}, limit_ms={limit_ms}, budget_mode=HardFail"
            ))),
            BudgetMode::SoftDegrade => Ok(BudgetStatus::ExceededSoftDegrade),
        }
    }
}
