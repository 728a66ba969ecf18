// crates/dist-conformance-core/src/capability.rs
// ============================================================================
// Module: Capability Flags
// Description: Capability areas and the resolved enable bitmask.
// Purpose: Decide per check whether to run or skip, with a diagnostic.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each conformance area is toggled by one external signal. A signal enables
//! its area only when it holds the exact sentinel [`ENABLED_SENTINEL`]; any
//! other value, including an unset signal, leaves the area disabled. Flags
//! are resolved once into an immutable [`CapabilityFlags`] that is passed by
//! reference to every check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;

use crate::outcome::StepError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exact signal value that enables a capability area.
pub const ENABLED_SENTINEL: &str = "1";

/// Header line of the skip diagnostic.
const SKIP_REPORT_HEADER: &str =
    "you have skipped this test; if this is an error, check your environment variable settings:";

/// Plain skip message used by setup gating.
pub const PLAIN_SKIP_MESSAGE: &str = "you have skipped this test.";

// ============================================================================
// SECTION: Capability Areas
// ============================================================================

/// Independently toggleable conformance area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityArea {
    /// Manifest and blob retrieval.
    Pull,
    /// Blob uploads and manifest publication.
    Push,
    /// Tag listing and pagination.
    ContentDiscovery,
    /// Manifest and blob deletion.
    ContentManagement,
}

impl CapabilityArea {
    /// All areas in execution order.
    pub const ALL: [Self; 4] =
        [Self::Pull, Self::Push, Self::ContentDiscovery, Self::ContentManagement];

    /// Returns the bit assigned to the area.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::Pull => 1 << 0,
            Self::Push => 1 << 1,
            Self::ContentDiscovery => 1 << 2,
            Self::ContentManagement => 1 << 3,
        }
    }

    /// Returns the external signal name that toggles the area.
    #[must_use]
    pub const fn signal_name(self) -> &'static str {
        match self {
            Self::Pull => "OCI_TEST_PULL",
            Self::Push => "OCI_TEST_PUSH",
            Self::ContentDiscovery => "OCI_TEST_CONTENT_DISCOVERY",
            Self::ContentManagement => "OCI_TEST_CONTENT_MANAGEMENT",
        }
    }

    /// Returns the human-readable area title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Pull => "Pull",
            Self::Push => "Push",
            Self::ContentDiscovery => "Content Discovery",
            Self::ContentManagement => "Content Management",
        }
    }
}

impl fmt::Display for CapabilityArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

// ============================================================================
// SECTION: Raw Signals
// ============================================================================

/// Raw observed signal values, one slot per area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySignals {
    /// Observed values indexed by [`CapabilityArea::ALL`] position.
    values: [Option<String>; 4],
}

impl CapabilitySignals {
    /// Creates an empty signal set (every area unset).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the raw value observed for an area.
    #[must_use]
    pub fn with(mut self, area: CapabilityArea, value: Option<String>) -> Self {
        self.values[area_index(area)] = value;
        self
    }

    /// Returns the raw value observed for an area.
    #[must_use]
    pub fn raw(&self, area: CapabilityArea) -> Option<&str> {
        self.values[area_index(area)].as_deref()
    }
}

/// Returns the slot index of an area.
const fn area_index(area: CapabilityArea) -> usize {
    match area {
        CapabilityArea::Pull => 0,
        CapabilityArea::Push => 1,
        CapabilityArea::ContentDiscovery => 2,
        CapabilityArea::ContentManagement => 3,
    }
}

// ============================================================================
// SECTION: Resolved Flags
// ============================================================================

/// Resolved capability bitmask with the raw signals kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityFlags {
    /// Enabled-area bitmask.
    enabled: u8,
    /// Signals the bitmask was resolved from.
    signals: CapabilitySignals,
}

impl CapabilityFlags {
    /// Resolves the bitmask from raw signals.
    #[must_use]
    pub fn resolve(signals: CapabilitySignals) -> Self {
        let enabled = CapabilityArea::ALL
            .iter()
            .filter(|area| signals.raw(**area) == Some(ENABLED_SENTINEL))
            .fold(0_u8, |mask, area| mask | area.bit());
        Self {
            enabled,
            signals,
        }
    }

    /// Returns the raw bitmask.
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.enabled
    }

    /// Returns true when the area is enabled.
    #[must_use]
    pub const fn is_enabled(&self, area: CapabilityArea) -> bool {
        self.enabled & area.bit() != 0
    }

    /// Skips the current step unless the area is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Skipped`] carrying [`Self::skip_report`] when the
    /// area is disabled.
    pub fn skip_unless(&self, area: CapabilityArea) -> Result<(), StepError> {
        if self.is_enabled(area) {
            return Ok(());
        }
        Err(StepError::Skipped(self.skip_report()))
    }

    /// Builds the skip diagnostic naming every signal and its raw value.
    #[must_use]
    pub fn skip_report(&self) -> String {
        let mut out = String::from(SKIP_REPORT_HEADER);
        out.push('\n');
        for area in CapabilityArea::ALL {
            let raw = self.signals.raw(area).unwrap_or_default();
            let _ = writeln!(out, "\t{}={raw}", area.signal_name());
        }
        out
    }
}

// ============================================================================
// SECTION: Conditional Gates
// ============================================================================

/// Skips the current step unless `condition` holds.
///
/// # Errors
///
/// Returns [`StepError::Skipped`] when `condition` is false.
pub fn run_only_if(condition: bool) -> Result<(), StepError> {
    if condition { Ok(()) } else { Err(StepError::Skipped(PLAIN_SKIP_MESSAGE.to_string())) }
}

/// Skips the current step when `condition` holds.
///
/// # Errors
///
/// Returns [`StepError::Skipped`] when `condition` is true.
pub fn run_only_if_not(condition: bool) -> Result<(), StepError> {
    run_only_if(!condition)
}
