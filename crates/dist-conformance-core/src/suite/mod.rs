// crates/dist-conformance-core/src/suite/mod.rs
// ============================================================================
// Module: Conformance Suite
// Description: Declared check order, shared run state and the runner.
// Purpose: Execute capability areas as a sequential pipeline.
// Dependencies: crate::{capability, discovery, fixtures, outcome, probe}
// ============================================================================

//! ## Overview
//! A [`Check`] pairs a description with a gating area and a body. The runner
//! walks checks in declared order: pull, push, content discovery, content
//! management. Later checks consume state recorded by earlier ones in
//! [`SuiteState`], so there is no parallelism. A failing check never stops
//! the run.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod content_discovery;
mod content_management;
mod pull;
mod push;
mod uploads;

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::capability::CapabilityArea;
use crate::capability::CapabilityFlags;
use crate::discovery::DiscoveryVerifier;
use crate::fixtures::FixtureSet;
use crate::outcome::CheckReport;
use crate::outcome::StepError;
use crate::outcome::StepOutcome;
use crate::outcome::SuiteReport;
use crate::probe::Probe;

pub use uploads::push_blob;
pub use uploads::push_manifest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tag used by pull and push checks when no override is configured.
pub const DEFAULT_TAG_NAME: &str = "tagtest0";

/// Number of tags pushed by discovery setup.
pub const DISCOVERY_TAG_COUNT: usize = 4;

/// Returns the tag pushed by discovery setup at `index`.
#[must_use]
pub fn discovery_tag(index: usize) -> String {
    format!("test{index}")
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Which setup steps push their own fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupPlan {
    /// Pull setup pushes the config blob and manifest.
    pub run_pull_setup: bool,
    /// Discovery setup pushes the discovery tags.
    pub run_discovery_setup: bool,
}

impl SetupPlan {
    /// Derives the plan from the operator overrides.
    ///
    /// Pull setup is suppressed only when tag name, manifest digest and blob
    /// digest are all non-empty; discovery setup whenever a tag list override
    /// was supplied, even one that names no tags.
    #[must_use]
    pub fn from_overrides(
        tag_name: Option<&str>,
        manifest_digest: Option<&str>,
        blob_digest: Option<&str>,
        tag_list: Option<&[String]>,
    ) -> Self {
        let present = |value: Option<&str>| value.is_some_and(|value| !value.is_empty());
        Self {
            run_pull_setup: !(present(tag_name)
                && present(manifest_digest)
                && present(blob_digest)),
            run_discovery_setup: tag_list.is_none(),
        }
    }
}

impl Default for SetupPlan {
    fn default() -> Self {
        Self {
            run_pull_setup: true,
            run_discovery_setup: true,
        }
    }
}

/// Run-wide settings derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteSettings {
    /// Tag used by pull checks.
    pub tag_name: String,
    /// Tags expected to already exist for discovery.
    pub tag_list: Vec<String>,
    /// Setup plan.
    pub setup: SetupPlan,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            tag_name: DEFAULT_TAG_NAME.to_string(),
            tag_list: Vec::new(),
            setup: SetupPlan::default(),
        }
    }
}

// ============================================================================
// SECTION: Context & State
// ============================================================================

/// Read-only inputs shared by every check.
pub struct SuiteContext<'a> {
    /// Request executor.
    pub probe: &'a Probe,
    /// Fixture set.
    pub fixtures: &'a FixtureSet,
    /// Resolved capability flags.
    pub flags: &'a CapabilityFlags,
    /// Run settings.
    pub settings: &'a SuiteSettings,
}

/// Mutable state handed from earlier checks to later ones.
#[derive(Debug, Default)]
pub struct SuiteState {
    /// Location of the monolithic upload session.
    pub upload_location: Option<String>,
    /// Location of the chunked upload session, advanced per chunk.
    pub chunk_location: Option<String>,
    /// Pagination state.
    pub discovery: DiscoveryVerifier,
}

impl SuiteState {
    /// Takes a recorded location or fails.
    fn location(slot: Option<&String>, what: &str) -> Result<String, StepError> {
        slot.cloned()
            .ok_or_else(|| StepError::Failed(format!("no {what} recorded by an earlier check")))
    }
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Check body signature.
pub type CheckFn = fn(&SuiteContext<'_>, &mut SuiteState) -> Result<(), StepError>;

/// One conformance check.
#[derive(Clone, Copy)]
pub struct Check {
    /// Area the check reports under.
    pub area: CapabilityArea,
    /// Description.
    pub name: &'static str,
    /// Area that must be enabled for the check to run.
    pub gate: CapabilityArea,
    /// Check body.
    pub run: CheckFn,
}

/// Returns every check in execution order.
#[must_use]
pub fn all_checks() -> Vec<Check> {
    [pull::CHECKS, push::CHECKS, content_discovery::CHECKS, content_management::CHECKS].concat()
}

/// Runs `checks` in order and collects their outcomes.
#[must_use]
pub fn run_checks(ctx: &SuiteContext<'_>, checks: &[Check]) -> SuiteReport {
    let mut state = SuiteState::default();
    let mut report = SuiteReport::default();
    for check in checks {
        let result = ctx.flags.skip_unless(check.gate).and_then(|()| (check.run)(ctx, &mut state));
        report.push(CheckReport {
            area: check.area,
            name: check.name.to_string(),
            outcome: StepOutcome::from_result(result),
        });
    }
    report
}

/// Runs the full suite.
#[must_use]
pub fn run_suite(ctx: &SuiteContext<'_>) -> SuiteReport {
    run_checks(ctx, &all_checks())
}
