// crates/dist-conformance-core/src/suite/pull.rs
// ============================================================================
// Module: Pull Checks
// Description: Manifest and blob retrieval conformance.
// Purpose: Verify reads by tag, by digest, and of absent content.
// Dependencies: crate::{error_codes, probe}
// ============================================================================

use super::Check;
use super::SuiteContext;
use super::SuiteState;
use super::uploads::push_blob;
use super::uploads::push_manifest;
use crate::capability::CapabilityArea;
use crate::capability::run_only_if;
use crate::error_codes::ErrorCode;
use crate::error_codes::expect_error_code;
use crate::fixtures::MANIFEST_MEDIA_TYPE;
use crate::outcome::StepError;
use crate::outcome::ensure;
use crate::probe::BLOB_PATH;
use crate::probe::MANIFEST_PATH;
use crate::probe::Method;
use crate::probe::ProbeRequest;
use crate::probe::ProbeResponse;

/// Pull checks in execution order.
pub(super) const CHECKS: &[Check] = &[
    Check {
        area: CapabilityArea::Pull,
        name: "Setup: push config blob and manifest",
        gate: CapabilityArea::Pull,
        run: setup,
    },
    Check {
        area: CapabilityArea::Pull,
        name: "GET manifest by tag should yield 200 response",
        gate: CapabilityArea::Pull,
        run: manifest_by_tag,
    },
    Check {
        area: CapabilityArea::Pull,
        name: "GET manifest by digest should yield 200 response",
        gate: CapabilityArea::Pull,
        run: manifest_by_digest,
    },
    Check {
        area: CapabilityArea::Pull,
        name: "HEAD manifest by digest should yield 200 response",
        gate: CapabilityArea::Pull,
        run: head_manifest,
    },
    Check {
        area: CapabilityArea::Pull,
        name: "GET nonexistent manifest should yield 404 response",
        gate: CapabilityArea::Pull,
        run: nonexistent_manifest,
    },
    Check {
        area: CapabilityArea::Pull,
        name: "GET config blob should return content matching its digest",
        gate: CapabilityArea::Pull,
        run: config_blob,
    },
    Check {
        area: CapabilityArea::Pull,
        name: "GET blob with unknown digest should yield 404 response",
        gate: CapabilityArea::Pull,
        run: unknown_blob,
    },
];

/// Seeds the namespace unless the operator pointed at existing content.
fn setup(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    run_only_if(ctx.settings.setup.run_pull_setup)?;
    push_blob(ctx.probe, &ctx.fixtures.config)?;
    push_manifest(ctx.probe, &ctx.settings.tag_name, ctx.fixtures.manifest.bytes())?;
    Ok(())
}

/// Fetches a manifest with the manifest media type accepted.
fn fetch_manifest(
    ctx: &SuiteContext<'_>,
    method: Method,
    reference: &str,
) -> Result<ProbeResponse, StepError> {
    ctx.probe.send(
        &ProbeRequest::new(method, MANIFEST_PATH)
            .reference(reference)
            .header("Accept", MANIFEST_MEDIA_TYPE),
    )
}

/// Fetches the manifest by the configured tag.
fn manifest_by_tag(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    fetch_manifest(ctx, Method::Get, &ctx.settings.tag_name)?.expect_status(&[200])
}

/// Fetches the manifest by digest.
fn manifest_by_digest(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    let digest = ctx.fixtures.manifest.digest().to_string();
    fetch_manifest(ctx, Method::Get, &digest)?.expect_status(&[200])
}

/// Checks manifest existence by digest.
fn head_manifest(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    let digest = ctx.fixtures.manifest.digest().to_string();
    fetch_manifest(ctx, Method::Head, &digest)?.expect_status(&[200])
}

/// Fetches a reference that must not exist.
fn nonexistent_manifest(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    let response = fetch_manifest(ctx, Method::Get, &ctx.fixtures.nonexistent_reference)?;
    response.expect_status(&[404])?;
    expect_error_code(&response, &[ErrorCode::ManifestUnknown, ErrorCode::NameUnknown])
}

/// Fetches the config blob and verifies its content.
fn config_blob(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    let digest = ctx.fixtures.config.digest();
    let response =
        ctx.probe.send(&ProbeRequest::new(Method::Get, BLOB_PATH).digest(digest.to_string()))?;
    response.expect_status(&[200])?;
    ensure(digest.verifies(response.body()), || {
        format!(
            "blob content: expected bytes hashing to {digest}, got {} bytes",
            response.body().len()
        )
    })
}

/// Fetches a blob that was never pushed.
fn unknown_blob(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    let response = ctx.probe.send(
        &ProbeRequest::new(Method::Get, BLOB_PATH).digest(ctx.fixtures.dummy_digest.to_string()),
    )?;
    response.expect_status(&[404])?;
    expect_error_code(&response, &[ErrorCode::BlobUnknown])
}
