// crates/dist-conformance-core/src/suite/push.rs
// ============================================================================
// Module: Push Checks
// Description: Monolithic and chunked blob uploads, manifest publication.
// Purpose: Verify the upload session protocol and manifest validation.
// Dependencies: crate::{error_codes, fixtures, probe}
// ============================================================================

//! ## Overview
//! Upload sessions are stateful on the server: each PATCH answers with the
//! location the next request must target. The chunk checks therefore thread
//! the latest location through [`SuiteState::chunk_location`].

use super::Check;
use super::DEFAULT_TAG_NAME;
use super::SuiteContext;
use super::SuiteState;
use super::uploads::OCTET_STREAM;
use super::uploads::open_upload;
use super::uploads::push_blob;
use super::uploads::push_manifest;
use crate::capability::CapabilityArea;
use crate::error_codes::ErrorCode;
use crate::error_codes::expect_error_code;
use crate::fixtures::Chunk;
use crate::fixtures::MANIFEST_MEDIA_TYPE;
use crate::outcome::StepError;
use crate::outcome::ensure;
use crate::probe::BLOB_PATH;
use crate::probe::MANIFEST_PATH;
use crate::probe::Method;
use crate::probe::ProbeRequest;

/// Push checks in execution order.
pub(super) const CHECKS: &[Check] = &[
    Check {
        area: CapabilityArea::Push,
        name: "POST request to blob uploads should yield 202 response with Location",
        gate: CapabilityArea::Push,
        run: open_monolithic,
    },
    Check {
        area: CapabilityArea::Push,
        name: "PUT upload of a blob should yield 201 response",
        gate: CapabilityArea::Push,
        run: complete_monolithic,
    },
    Check {
        area: CapabilityArea::Push,
        name: "POST request to start a chunked upload should yield 202 response",
        gate: CapabilityArea::Push,
        run: open_chunked,
    },
    Check {
        area: CapabilityArea::Push,
        name: "PATCH request with first chunk should yield 202 response",
        gate: CapabilityArea::Push,
        run: patch_first_chunk,
    },
    Check {
        area: CapabilityArea::Push,
        name: "PATCH request with final chunk should yield 202 response",
        gate: CapabilityArea::Push,
        run: patch_final_chunk,
    },
    Check {
        area: CapabilityArea::Push,
        name: "PUT request closing a chunked upload should yield 201 response",
        gate: CapabilityArea::Push,
        run: close_chunked,
    },
    Check {
        area: CapabilityArea::Push,
        name: "HEAD request to a chunk-uploaded blob should yield 200 response",
        gate: CapabilityArea::Push,
        run: head_chunked_blob,
    },
    Check {
        area: CapabilityArea::Push,
        name: "PUT manifest should yield 201 response with Location",
        gate: CapabilityArea::Push,
        run: put_manifest,
    },
    Check {
        area: CapabilityArea::Push,
        name: "PUT malformed manifest should be rejected",
        gate: CapabilityArea::Push,
        run: put_malformed_manifest,
    },
];

/// Opens the monolithic upload session.
fn open_monolithic(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    state.upload_location = Some(open_upload(ctx.probe)?);
    Ok(())
}

/// Completes the monolithic upload with blob A.
fn complete_monolithic(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    let location = SuiteState::location(state.upload_location.as_ref(), "upload location")?;
    let blob = &ctx.fixtures.blob_a;
    let response = ctx.probe.send(
        &ProbeRequest::location(Method::Put, &location)
            .query("digest", blob.digest().to_string())
            .header("Content-Type", OCTET_STREAM)
            .body(blob.bytes()),
    )?;
    response.expect_status(&[201])?;
    response.require_header("Location")?;
    Ok(())
}

/// Opens the chunked upload session.
fn open_chunked(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    state.chunk_location = Some(open_upload(ctx.probe)?);
    Ok(())
}

/// Uploads one chunk and advances the session location.
fn patch_chunk(
    ctx: &SuiteContext<'_>,
    state: &mut SuiteState,
    chunk: Option<&Chunk>,
) -> Result<(), StepError> {
    let chunk = chunk.ok_or_else(|| StepError::failed("chunked fixture is missing a chunk"))?;
    let location = SuiteState::location(state.chunk_location.as_ref(), "chunked upload location")?;
    let response = ctx.probe.send(
        &ProbeRequest::location(Method::Patch, &location)
            .header("Content-Type", OCTET_STREAM)
            .header("Content-Range", chunk.range.header_value())
            .body(chunk.bytes.clone()),
    )?;
    response.expect_status(&[202])?;
    state.chunk_location = Some(response.location()?);
    Ok(())
}

/// Uploads the first chunk of blob B.
fn patch_first_chunk(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    patch_chunk(ctx, state, ctx.fixtures.blob_b_chunks.chunks().first())
}

/// Uploads the final chunk of blob B.
fn patch_final_chunk(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    patch_chunk(ctx, state, ctx.fixtures.blob_b_chunks.chunks().last())
}

/// Closes the chunked session with the full digest.
fn close_chunked(ctx: &SuiteContext<'_>, state: &mut SuiteState) -> Result<(), StepError> {
    let location = SuiteState::location(state.chunk_location.as_ref(), "chunked upload location")?;
    let response = ctx.probe.send(
        &ProbeRequest::location(Method::Put, &location)
            .query("digest", ctx.fixtures.blob_b_chunks.digest().to_string()),
    )?;
    response.expect_status(&[201])?;
    state.chunk_location = None;
    Ok(())
}

/// Checks that the chunk-uploaded blob resolves.
fn head_chunked_blob(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    let blob = &ctx.fixtures.blob_b;
    let response = ctx
        .probe
        .send(&ProbeRequest::new(Method::Head, BLOB_PATH).digest(blob.digest().to_string()))?;
    response.expect_status(&[200])?;
    let expected = blob.len().to_string();
    match response.header("Content-Length") {
        Some(actual) => ensure(actual == expected, || {
            format!("Content-Length: expected {expected}, got {actual}")
        }),
        None => Ok(()),
    }
}

/// The config blob is pushed first so the manifest references known content.
fn put_manifest(ctx: &SuiteContext<'_>, _state: &mut SuiteState) -> Result<(), StepError> {
    push_blob(ctx.probe, &ctx.fixtures.config)?;
    push_manifest(ctx.probe, DEFAULT_TAG_NAME, ctx.fixtures.manifest.bytes())?;
    Ok(())
}

/// Pushes bytes that are not a manifest.
fn put_malformed_manifest(
    ctx: &SuiteContext<'_>,
    _state: &mut SuiteState,
) -> Result<(), StepError> {
    let response = ctx.probe.send(
        &ProbeRequest::new(Method::Put, MANIFEST_PATH)
            .reference(DEFAULT_TAG_NAME)
            .header("Content-Type", MANIFEST_MEDIA_TYPE)
            .body(ctx.fixtures.malformed_manifest.clone()),
    )?;
    ensure((400..500).contains(&response.status()), || {
        format!("status: expected a 4xx rejection, got {}", response.status())
    })?;
    expect_error_code(&response, &[ErrorCode::ManifestInvalid])
}
