// crates/dist-conformance-core/src/fixtures.rs
// ============================================================================
// Module: Conformance Fixtures
// Description: Deterministic payloads, digests and chunk ranges.
// Purpose: Build the read-only fixture set shared by every capability area.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Fixtures are pure functions of fixed inputs plus optional digest
//! overrides. The manifest embeds the config's effective digest and length,
//! so it is built by [`manifest_fixture`] which takes the config fixture as
//! its only input; there is no way to build a manifest without one.
//!
//! A fixture's digest always equals the hash of its bytes unless it was
//! built with an explicit override, which [`Fixture::is_overridden`] records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::digest::Digest;
use crate::digest::DigestError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type of image manifests.
pub const MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

/// Media type of image configs.
pub const CONFIG_MEDIA_TYPE: &str = "application/vnd.oci.image.config.v1+json";

/// Manifest schema version.
pub const MANIFEST_SCHEMA_VERSION: u32 = 2;

/// Fixed config template. Contains no runtime-variable data.
const CONFIG_TEMPLATE: &str = r#"
{
    "architecture": "amd64",
    "os": "linux",
    "rootfs": {
        "diff_ids": [],
        "type": "layers"
    }
}
"#;

/// Bytes used to exercise manifest rejection.
const MALFORMED_MANIFEST: &[u8] = b"blablabla";

/// Well-formed reference that no registry is expected to hold.
pub const NONEXISTENT_REFERENCE: &str = ".INVALID_MANIFEST_NAME";

/// Monolithic upload payload.
const BLOB_A: &[u8] = b"NBA Jam on my NBA toast";

/// Chunked upload payload.
const BLOB_B: &[u8] = b"Hello, how are you today?";

/// Offset at which blob B is split into two chunks.
pub const BLOB_B_SPLIT_OFFSET: usize = 3;

/// Content hashed to produce a digest that matches no pushed blob.
const DUMMY_DIGEST_SOURCE: &str = "hello world";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal errors raised while building fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// A digest override is malformed.
    #[error("invalid {name} override: {source}")]
    InvalidOverride {
        /// Override that failed to parse.
        name: &'static str,
        /// Parse failure.
        source: DigestError,
    },
    /// Split offsets do not produce non-empty, ordered chunks.
    #[error("invalid chunk split for {len}-byte payload at offsets {offsets:?}")]
    InvalidSplit {
        /// Parent payload length.
        len: usize,
        /// Requested split offsets.
        offsets: Vec<usize>,
    },
    /// Manifest serialization failed.
    #[error("failed to serialize manifest: {0}")]
    Serialize(String),
}

// ============================================================================
// SECTION: Fixture
// ============================================================================

/// Byte payload and its content address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    /// Payload bytes.
    bytes: Vec<u8>,
    /// Effective digest.
    digest: Digest,
    /// True when `digest` came from an override instead of the bytes.
    overridden: bool,
}

impl Fixture {
    /// Builds a fixture whose digest is computed from `bytes`.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let digest = Digest::from_bytes(&bytes);
        Self {
            bytes,
            digest,
            overridden: false,
        }
    }

    /// Replaces the digest with an explicit override, if one is given.
    #[must_use]
    pub fn with_digest_override(mut self, digest: Option<Digest>) -> Self {
        if let Some(digest) = digest {
            self.digest = digest;
            self.overridden = true;
        }
        self
    }

    /// Returns the payload bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the effective digest.
    #[must_use]
    pub const fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for an empty payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns true when the digest was overridden.
    #[must_use]
    pub const fn is_overridden(&self) -> bool {
        self.overridden
    }
}

// ============================================================================
// SECTION: Chunked Fixture
// ============================================================================

/// Inclusive byte range within a parent payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: usize,
    /// Last byte offset (inclusive).
    pub end: usize,
}

impl ByteRange {
    /// Returns the range as a `Content-Range` value (`start-end`).
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }

    /// Returns the number of bytes covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: ranges cover at least one byte.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// One contiguous slice of a chunked payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk bytes.
    pub bytes: Vec<u8>,
    /// Position of the chunk in the parent.
    pub range: ByteRange,
}

impl Chunk {
    /// Returns the chunk length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for an empty chunk.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Payload split into contiguous, non-overlapping chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedFixture {
    /// Digest of the reassembled payload.
    digest: Digest,
    /// Chunks in range order.
    chunks: Vec<Chunk>,
}

impl ChunkedFixture {
    /// Splits `parent` at strictly increasing interior offsets.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::InvalidSplit`] unless the offsets yield at
    /// least two non-empty chunks.
    pub fn split(parent: &Fixture, offsets: &[usize]) -> Result<Self, FixtureError> {
        let len = parent.len();
        let invalid = || FixtureError::InvalidSplit {
            len,
            offsets: offsets.to_vec(),
        };
        if offsets.is_empty() {
            return Err(invalid());
        }
        let mut bounds = Vec::with_capacity(offsets.len() + 2);
        bounds.push(0);
        bounds.extend_from_slice(offsets);
        bounds.push(len);
        if bounds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(invalid());
        }
        let chunks = bounds
            .windows(2)
            .map(|pair| Chunk {
                bytes: parent.bytes()[pair[0]..pair[1]].to_vec(),
                range: ByteRange {
                    start: pair[0],
                    end: pair[1] - 1,
                },
            })
            .collect();
        Ok(Self {
            digest: parent.digest().clone(),
            chunks,
        })
    }

    /// Returns the digest of the full payload.
    #[must_use]
    pub const fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Returns the chunks in range order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Concatenates the chunks back into the parent payload.
    #[must_use]
    pub fn reassemble(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|chunk| chunk.bytes.iter().copied()).collect()
    }
}

// ============================================================================
// SECTION: Manifest Document
// ============================================================================

/// Content descriptor referencing a blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Blob digest.
    pub digest: String,
    /// Blob media type.
    pub media_type: String,
    /// Blob size in bytes.
    pub size: u64,
}

/// Image manifest wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Manifest media type.
    pub media_type: String,
    /// Config descriptor.
    pub config: Descriptor,
    /// Layer descriptors.
    pub layers: Vec<Descriptor>,
    /// Schema version.
    pub schema_version: u32,
}

/// Builds the manifest fixture that references `config`.
///
/// # Errors
///
/// Returns [`FixtureError::Serialize`] when the manifest cannot be encoded.
pub fn manifest_fixture(config: &Fixture) -> Result<Fixture, FixtureError> {
    let manifest = ImageManifest {
        media_type: MANIFEST_MEDIA_TYPE.to_string(),
        config: Descriptor {
            digest: config.digest().to_string(),
            media_type: CONFIG_MEDIA_TYPE.to_string(),
            size: config.len() as u64,
        },
        layers: Vec::new(),
        schema_version: MANIFEST_SCHEMA_VERSION,
    };
    let bytes =
        serde_json::to_vec(&manifest).map_err(|err| FixtureError::Serialize(err.to_string()))?;
    Ok(Fixture::new(bytes))
}

// ============================================================================
// SECTION: Fixture Set
// ============================================================================

/// Operator-supplied digest overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureOverrides {
    /// Config blob digest override.
    pub blob_digest: Option<String>,
    /// Manifest digest override.
    pub manifest_digest: Option<String>,
}

/// Complete read-only fixture set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSet {
    /// Image config blob.
    pub config: Fixture,
    /// Manifest referencing `config`.
    pub manifest: Fixture,
    /// Bytes that are not a valid manifest.
    pub malformed_manifest: Vec<u8>,
    /// Reference guaranteed to be absent.
    pub nonexistent_reference: String,
    /// Blob pushed in one request.
    pub blob_a: Fixture,
    /// Blob pushed in chunks.
    pub blob_b: Fixture,
    /// `blob_b` split for chunked upload.
    pub blob_b_chunks: ChunkedFixture,
    /// Digest that matches no pushed content.
    pub dummy_digest: Digest,
}

impl FixtureSet {
    /// Builds every fixture in dependency order.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when an override is malformed or a derived
    /// fixture cannot be built. Callers treat this as fatal.
    pub fn build(overrides: &FixtureOverrides) -> Result<Self, FixtureError> {
        let config = Fixture::new(CONFIG_TEMPLATE.as_bytes())
            .with_digest_override(parse_override("blob digest", overrides.blob_digest.as_deref())?);
        let manifest = manifest_fixture(&config)?.with_digest_override(parse_override(
            "manifest digest",
            overrides.manifest_digest.as_deref(),
        )?);
        let blob_a = Fixture::new(BLOB_A);
        let blob_b = Fixture::new(BLOB_B);
        let blob_b_chunks = ChunkedFixture::split(&blob_b, &[BLOB_B_SPLIT_OFFSET])?;
        Ok(Self {
            config,
            manifest,
            malformed_manifest: MALFORMED_MANIFEST.to_vec(),
            nonexistent_reference: NONEXISTENT_REFERENCE.to_string(),
            blob_a,
            blob_b,
            blob_b_chunks,
            dummy_digest: Digest::from_str_content(DUMMY_DIGEST_SOURCE),
        })
    }
}

/// Parses an optional digest override.
fn parse_override(name: &'static str, raw: Option<&str>) -> Result<Option<Digest>, FixtureError> {
    raw.map(|value| {
        Digest::parse(value).map_err(|source| FixtureError::InvalidOverride {
            name,
            source,
        })
    })
    .transpose()
}
