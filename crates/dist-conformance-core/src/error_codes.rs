// crates/dist-conformance-core/src/error_codes.rs
// ============================================================================
// Module: Protocol Error Codes
// Description: Closed taxonomy of machine-readable registry error codes.
// Purpose: Assert that failure responses carry the expected code.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Error codes are a closed enumeration with an explicit string mapping; the
//! wire identifier of each member never changes. Responses are decoded into
//! an [`ErrorEnvelope`] only when a negative check expects failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::outcome::StepError;
use crate::probe::ProbeResponse;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Machine-readable protocol error identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Blob unknown to registry.
    BlobUnknown,
    /// Blob upload invalid.
    BlobUploadInvalid,
    /// Blob upload unknown to registry.
    BlobUploadUnknown,
    /// Provided digest did not match uploaded content.
    DigestInvalid,
    /// Manifest references a blob unknown to the registry.
    ManifestBlobUnknown,
    /// Manifest invalid.
    ManifestInvalid,
    /// Manifest unknown to registry.
    ManifestUnknown,
    /// Manifest failed signature verification.
    ManifestUnverified,
    /// Invalid repository name.
    NameInvalid,
    /// Repository name not known to registry.
    NameUnknown,
    /// Provided length did not match content length.
    SizeInvalid,
    /// Manifest tag did not match URI.
    TagInvalid,
    /// Authentication required.
    Unauthorized,
    /// Requested access to the resource is denied.
    Denied,
    /// The operation is unsupported.
    Unsupported,
}

impl ErrorCode {
    /// All members in taxonomy order.
    pub const ALL: [Self; 15] = [
        Self::BlobUnknown,
        Self::BlobUploadInvalid,
        Self::BlobUploadUnknown,
        Self::DigestInvalid,
        Self::ManifestBlobUnknown,
        Self::ManifestInvalid,
        Self::ManifestUnknown,
        Self::ManifestUnverified,
        Self::NameInvalid,
        Self::NameUnknown,
        Self::SizeInvalid,
        Self::TagInvalid,
        Self::Unauthorized,
        Self::Denied,
        Self::Unsupported,
    ];

    /// Returns the wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlobUnknown => "BLOB_UNKNOWN",
            Self::BlobUploadInvalid => "BLOB_UPLOAD_INVALID",
            Self::BlobUploadUnknown => "BLOB_UPLOAD_UNKNOWN",
            Self::DigestInvalid => "DIGEST_INVALID",
            Self::ManifestBlobUnknown => "MANIFEST_BLOB_UNKNOWN",
            Self::ManifestInvalid => "MANIFEST_INVALID",
            Self::ManifestUnknown => "MANIFEST_UNKNOWN",
            Self::ManifestUnverified => "MANIFEST_UNVERIFIED",
            Self::NameInvalid => "NAME_INVALID",
            Self::NameUnknown => "NAME_UNKNOWN",
            Self::SizeInvalid => "SIZE_INVALID",
            Self::TagInvalid => "TAG_INVALID",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Denied => "DENIED",
            Self::Unsupported => "UNSUPPORTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognized identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code `{0}`")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == value)
            .ok_or_else(|| UnknownErrorCode(value.to_string()))
    }
}

// ============================================================================
// SECTION: Error Envelope
// ============================================================================

/// One entry of an error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Wire identifier (kept raw so unknown codes still decode).
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Unstructured detail.
    #[serde(default)]
    pub detail: Option<Value>,
}

/// Structured error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Reported errors.
    pub errors: Vec<ErrorDetail>,
}

impl ErrorEnvelope {
    /// Builds an envelope carrying a single code.
    #[must_use]
    pub fn single(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            errors: vec![ErrorDetail {
                code: code.as_str().to_string(),
                message: message.into(),
                detail: None,
            }],
        }
    }

    /// Returns the first code in the envelope, if recognized.
    #[must_use]
    pub fn first_code(&self) -> Option<ErrorCode> {
        self.errors.first().and_then(|detail| detail.code.parse().ok())
    }
}

/// Asserts that a failure body carries one of `expected`.
///
/// Empty bodies pass, since HEAD responses and some proxies never carry one.
///
/// # Errors
///
/// Returns [`StepError::Failed`] when the body does not decode as an
/// [`ErrorEnvelope`] or its first code is not in `expected`.
pub fn expect_error_code(
    response: &ProbeResponse,
    expected: &[ErrorCode],
) -> Result<(), StepError> {
    if response.body().is_empty() {
        return Ok(());
    }
    let envelope: ErrorEnvelope = response.json()?;
    let actual = envelope.errors.first().map(|detail| detail.code.as_str());
    if envelope.first_code().is_some_and(|code| expected.contains(&code)) {
        return Ok(());
    }
    let expected: Vec<&str> = expected.iter().map(|code| code.as_str()).collect();
    Err(StepError::Failed(format!("error code: expected one of {expected:?}, got {actual:?}")))
}
