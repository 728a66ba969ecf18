// crates/dist-conformance-core/src/suite/uploads.rs
// ============================================================================
// Module: Upload Helpers
// Description: Blob and manifest pushes shared by setup checks.
// Purpose: Seed a namespace with fixtures before read-side checks.
// Dependencies: crate::{fixtures, outcome, probe}
// ============================================================================

use crate::fixtures::Fixture;
use crate::fixtures::MANIFEST_MEDIA_TYPE;
use crate::outcome::StepError;
use crate::probe::BLOB_UPLOADS_PATH;
use crate::probe::MANIFEST_PATH;
use crate::probe::Method;
use crate::probe::Probe;
use crate::probe::ProbeRequest;
use crate::probe::ProbeResponse;

/// Content type for raw blob bytes.
pub(crate) const OCTET_STREAM: &str = "application/octet-stream";

/// Opens an upload session and returns its location.
pub(crate) fn open_upload(probe: &Probe) -> Result<String, StepError> {
    let response = probe.send(&ProbeRequest::new(Method::Post, BLOB_UPLOADS_PATH))?;
    response.expect_status(&[202])?;
    response.location()
}

/// Pushes a blob with a POST/PUT monolithic upload.
///
/// # Errors
///
/// Returns [`StepError::Failed`] unless the session opens with 202 and the
/// upload completes with 201.
pub fn push_blob(probe: &Probe, blob: &Fixture) -> Result<ProbeResponse, StepError> {
    let location = open_upload(probe)?;
    let response = probe.send(
        &ProbeRequest::location(Method::Put, &location)
            .query("digest", blob.digest().to_string())
            .header("Content-Type", OCTET_STREAM)
            .body(blob.bytes()),
    )?;
    response.expect_status(&[201])?;
    Ok(response)
}

/// Pushes manifest bytes under `reference`.
///
/// # Errors
///
/// Returns [`StepError::Failed`] unless the registry answers 201 with a
/// `Location` header.
pub fn push_manifest(
    probe: &Probe,
    reference: &str,
    manifest: &[u8],
) -> Result<ProbeResponse, StepError> {
    let response = probe.send(
        &ProbeRequest::new(Method::Put, MANIFEST_PATH)
            .reference(reference)
            .header("Content-Type", MANIFEST_MEDIA_TYPE)
            .body(manifest),
    )?;
    response.expect_status(&[201])?;
    response.require_header("Location")?;
    Ok(response)
}
