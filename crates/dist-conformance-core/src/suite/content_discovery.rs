// crates/dist-conformance-core/src/suite/content_discovery.rs
// ============================================================================
// Module: Content Discovery Checks
// Description: Tag listing, truncation and cursor continuation.
// Purpose: Drive the discovery verifier against a populated namespace.
// Dependencies: crate::{discovery, probe}
// ============================================================================

use super::Check;
use super::DISCOVERY_TAG_COUNT;
use super::SuiteContext;
use super::SuiteState;
use super::discovery_tag;
use super::uploads::push_blob;
use super::uploads::push_manifest;
use crate::capability::CapabilityArea;
use crate::capability::run_only_if;
use crate::fixtures::MANIFEST_MEDIA_TYPE;
use crate::outcome::StepError;
use crate::probe::MANIFEST_PATH;
use crate::probe::Method;
use crate::probe::ProbeRequest;

/// Content discovery checks in execution order.
pub(super) const CHECKS: &[Check] = &[
    Check {
        area: CapabilityArea::ContentDiscovery,
        name: "Setup: push tags to repository",
        gate: CapabilityArea::Push,
        run: setup,
    },
    Check {
        area: CapabilityArea::ContentDiscovery,
        name: "GET request to list tags should yield 200 response",
        gate: CapabilityArea::ContentDiscovery,
        run: list_all,
    },
    Check {
        area: CapabilityArea::ContentDiscovery,
        name: "GET request to manifest URL (tag) should yield 200 response",
        gate: CapabilityArea::ContentDiscovery,
        run: manifest_for_first_tag,
    },
    Check {
        area: CapabilityArea::ContentDiscovery,
        name: "GET number of tags should be limitable by `n` query parameter",
        gate: CapabilityArea::ContentDiscovery,
        run: truncation,
    },
    Check {
        area: CapabilityArea::ContentDiscovery,
        name: "GET start of tag is set by `last` query parameter",
        gate: CapabilityArea::ContentDiscovery,
        run: cursor,
    },
];

/// Pushes `test0..test3`, all pointing at the shared manifest.
fn setup(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    run_only_if(ctx.settings.setup.run_discovery_setup)?;
    push_blob(ctx.probe, &ctx.fixtures.config)?;
    for index in 0..DISCOVERY_TAG_COUNT {
        push_manifest(ctx.probe, &discovery_tag(index), ctx.fixtures.manifest.bytes())?;
    }
    Ok(())
}

/// Records the baseline; an operator tag list must be fully present.
fn list_all(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    state.discovery.record_baseline(ctx.probe)?;
    if ctx.settings.tag_list.is_empty() {
        return Ok(());
    }
    state.discovery.verify_contains(&ctx.settings.tag_list)
}

/// Fetches the manifest behind the first listed tag.
fn manifest_for_first_tag(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    let first = state
        .discovery
        .baseline()
        .and_then(|listing| listing.tags.first())
        .cloned()
        .ok_or_else(|| StepError::failed("tag list: expected at least one tag, got none"))?;
    let response = ctx.probe.send(
        &ProbeRequest::new(Method::Get, MANIFEST_PATH)
            .reference(first)
            .header("Accept", MANIFEST_MEDIA_TYPE),
    )?;
    response.expect_status(&[200])
}

/// Runs the truncation step of the verifier.
fn truncation(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    state.discovery.verify_truncation(ctx.probe)
}

/// Runs the cursor step of the verifier.
fn cursor(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    state.discovery.verify_cursor(ctx.probe)
}
