// crates/dist-conformance-core/src/outcome.rs
// ============================================================================
// Module: Check Outcomes
// Description: Pass, fail and skip outcomes plus suite-level tallies.
// Purpose: Keep skips separate from pass/fail accounting.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A check body returns `Result<(), StepError>`. Both skip and failure travel
//! through `?`, and the runner maps them onto [`StepOutcome`]. Skips are
//! tallied on their own counter and never contribute to pass/fail totals.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::capability::CapabilityArea;

// ============================================================================
// SECTION: Step Errors
// ============================================================================

/// Early exit from a check body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// The check does not apply under the current configuration.
    #[error("skipped: {0}")]
    Skipped(String),
    /// An assertion was violated or the exchange could not complete.
    #[error("failed: {0}")]
    Failed(String),
}

impl StepError {
    /// Builds a failure from any displayable message.
    #[must_use]
    pub fn failed(message: impl Display) -> Self {
        Self::Failed(message.to_string())
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Final outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Every assertion held.
    Passed,
    /// An assertion was violated.
    Failed {
        /// Literal expected-versus-actual description.
        message: String,
    },
    /// The check was not run.
    Skipped {
        /// Diagnostic explaining the skip.
        reason: String,
    },
}

impl StepOutcome {
    /// Maps a check body result onto an outcome.
    #[must_use]
    pub fn from_result(result: Result<(), StepError>) -> Self {
        match result {
            Ok(()) => Self::Passed,
            Err(StepError::Failed(message)) => Self::Failed {
                message,
            },
            Err(StepError::Skipped(reason)) => Self::Skipped {
                reason,
            },
        }
    }

    /// Returns a short status label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "pass",
            Self::Failed {
                ..
            } => "fail",
            Self::Skipped {
                ..
            } => "skip",
        }
    }
}

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Area the check belongs to.
    pub area: CapabilityArea,
    /// Check description.
    pub name: String,
    /// Check outcome.
    pub outcome: StepOutcome,
}

// ============================================================================
// SECTION: Suite Report
// ============================================================================

/// Outcomes for an entire run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Per-check outcomes.
    pub checks: Vec<CheckReport>,
}

impl SuiteReport {
    /// Appends a check outcome.
    pub fn push(&mut self, report: CheckReport) {
        self.checks.push(report);
    }

    /// Number of passed checks.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(|outcome| matches!(outcome, StepOutcome::Passed))
    }

    /// Number of failed checks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, StepOutcome::Failed { .. }))
    }

    /// Number of skipped checks.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, StepOutcome::Skipped { .. }))
    }

    /// Returns true when no check failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Returns the checks recorded for one area.
    pub fn area(&self, area: CapabilityArea) -> impl Iterator<Item = &CheckReport> {
        self.checks.iter().filter(move |check| check.area == area)
    }

    /// Returns a copy without skipped checks.
    #[must_use]
    pub fn without_skipped(&self) -> Self {
        Self {
            checks: self
                .checks
                .iter()
                .filter(|check| !matches!(check.outcome, StepOutcome::Skipped { .. }))
                .cloned()
                .collect(),
        }
    }

    /// Counts outcomes matching a predicate.
    fn count(&self, predicate: impl Fn(&StepOutcome) -> bool) -> usize {
        self.checks.iter().filter(|check| predicate(&check.outcome)).count()
    }
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// Asserts equality, reporting both literal values on mismatch.
///
/// # Errors
///
/// Returns [`StepError::Failed`] when `expected != actual`.
pub fn expect_eq<T: PartialEq + std::fmt::Debug>(
    label: &str,
    expected: &T,
    actual: &T,
) -> Result<(), StepError> {
    if expected == actual {
        return Ok(());
    }
    Err(StepError::Failed(format!("{label}: expected {expected:?}, got {actual:?}")))
}

/// Asserts a condition with a prepared failure message.
///
/// # Errors
///
/// Returns [`StepError::Failed`] carrying `message` when `condition` is false.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), StepError> {
    if condition { Ok(()) } else { Err(StepError::Failed(message())) }
}
