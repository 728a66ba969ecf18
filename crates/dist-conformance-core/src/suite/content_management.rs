// crates/dist-conformance-core/src/suite/content_management.rs
// ============================================================================
// Module: Content Management Checks
// Description: Manifest and blob deletion.
// Purpose: Verify deletes are accepted and deleted content stops resolving.
// Dependencies: crate::{error_codes, probe}
// ============================================================================

use super::Check;
use super::DEFAULT_TAG_NAME;
use super::SuiteContext;
use super::SuiteState;
use super::uploads::push_blob;
use super::uploads::push_manifest;
use crate::capability::CapabilityArea;
use crate::error_codes::ErrorCode;
use crate::error_codes::expect_error_code;
use crate::outcome::StepError;
use crate::probe::BLOB_PATH;
use crate::probe::MANIFEST_PATH;
use crate::probe::Method;
use crate::probe::ProbeRequest;

/// Content management checks in execution order.
pub(super) const CHECKS: &[Check] = &[
    Check {
        area: CapabilityArea::ContentManagement,
        name: "Setup: push manifest and blob to delete",
        gate: CapabilityArea::ContentManagement,
        run: setup,
    },
    Check {
        area: CapabilityArea::ContentManagement,
        name: "DELETE request to manifest by digest should yield 202 response",
        gate: CapabilityArea::ContentManagement,
        run: delete_manifest,
    },
    Check {
        area: CapabilityArea::ContentManagement,
        name: "GET request to deleted manifest should yield 404 response",
        gate: CapabilityArea::ContentManagement,
        run: deleted_manifest_is_gone,
    },
    Check {
        area: CapabilityArea::ContentManagement,
        name: "DELETE request to blob should yield 202 response",
        gate: CapabilityArea::ContentManagement,
        run: delete_blob,
    },
    Check {
        area: CapabilityArea::ContentManagement,
        name: "GET request to deleted blob should yield 404 response",
        gate: CapabilityArea::ContentManagement,
        run: deleted_blob_is_gone,
    },
];

/// Pushes the manifest and blob that later checks delete.
fn setup(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    push_blob(ctx.probe, &ctx.fixtures.config)?;
    push_manifest(ctx.probe, DEFAULT_TAG_NAME, ctx.fixtures.manifest.bytes())?;
    push_blob(ctx.probe, &ctx.fixtures.blob_a)?;
    Ok(())
}

/// Builds a request addressing the manifest fixture by digest.
fn manifest_request(ctx: &SuiteContext<'_>, method: Method) -> ProbeRequest {
    ProbeRequest::new(method, MANIFEST_PATH).reference(ctx.fixtures.manifest.digest().to_string())
}

/// Builds a request addressing blob A by digest.
fn blob_request(ctx: &SuiteContext<'_>, method: Method) -> ProbeRequest {
    ProbeRequest::new(method, BLOB_PATH).digest(ctx.fixtures.blob_a.digest().to_string())
}

/// Deletes the manifest by digest.
fn delete_manifest(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    ctx.probe.send(&manifest_request(ctx, Method::Delete))?.expect_status(&[202])
}

/// Fetches the deleted manifest.
fn deleted_manifest_is_gone(
    ctx: &SuiteContext<'_>,
    _state: &mut SuiteState,
) -> Result<(), StepError> {
    let response = ctx.probe.send(&manifest_request(ctx, Method::Get))?;
    response.expect_status(&[404])?;
    expect_error_code(&response, &[ErrorCode::ManifestUnknown, ErrorCode::NameUnknown])
}

/// Deletes blob A.
fn delete_blob(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    ctx.probe.send(&blob_request(ctx, Method::Delete))?.expect_status(&[202])
}

/// Fetches the deleted blob.
fn deleted_blob_is_gone(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    let response = ctx.probe.send(&blob_request(ctx, Method::Get))?;
    response.expect_status(&[404])?;
    expect_error_code(&response, &[ErrorCode::BlobUnknown, ErrorCode::NameUnknown])
}
