// crates/dist-conformance-core/src/digest.rs
// ============================================================================
// Module: Content Digests
// Description: Algorithm-prefixed content addresses for fixtures.
// Purpose: Compute and validate `sha256:<hex>` and `sha512:<hex>` digests.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! Digests are the content addresses used on the wire. Computed digests are
//! always SHA-256 and lowercase hex. Parsed digests (operator overrides) may
//! use any registered algorithm; they are validated for shape but never
//! recomputed, since they point at content the engine never holds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest as _;
use sha2::Sha256;
use sha2::Sha512;
use thiserror::Error;

// ============================================================================
// SECTION: Algorithm
// ============================================================================

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// SHA-256 (the only algorithm the fixtures are computed with).
    Sha256,
    /// SHA-512, accepted for content addressed by the remote.
    Sha512,
}

impl DigestAlgorithm {
    /// Returns the wire prefix for the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Returns the expected hex length of an encoded digest.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing a digest string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    /// The value has no `algorithm:` prefix.
    #[error("digest `{0}` is missing an algorithm prefix")]
    MissingAlgorithm(String),
    /// The algorithm prefix is not recognized.
    #[error("digest `{0}` uses an unsupported algorithm")]
    UnsupportedAlgorithm(String),
    /// The encoded portion is not lowercase hex of the right length.
    #[error("digest `{0}` has an invalid encoded value")]
    InvalidEncoding(String),
}

// ============================================================================
// SECTION: Digest
// ============================================================================

/// Algorithm-prefixed content address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    /// Algorithm used to compute the digest.
    algorithm: DigestAlgorithm,
    /// Lowercase hex-encoded hash.
    encoded: String,
}

impl Digest {
    /// Computes the SHA-256 digest of `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::compute(DigestAlgorithm::Sha256, bytes)
    }

    /// Computes the digest of `bytes` with `algorithm`.
    #[must_use]
    pub fn compute(algorithm: DigestAlgorithm, bytes: &[u8]) -> Self {
        let encoded = match algorithm {
            DigestAlgorithm::Sha256 => hex_encode(&Sha256::digest(bytes)),
            DigestAlgorithm::Sha512 => hex_encode(&Sha512::digest(bytes)),
        };
        Self {
            algorithm,
            encoded,
        }
    }

    /// Computes the digest of a UTF-8 string.
    #[must_use]
    pub fn from_str_content(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }

    /// Parses an `algorithm:hex` string.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] when the prefix is missing or unsupported, or
    /// the encoded part is not lowercase hex of the expected length.
    pub fn parse(value: &str) -> Result<Self, DigestError> {
        let Some((algorithm, encoded)) = value.split_once(':') else {
            return Err(DigestError::MissingAlgorithm(value.to_string()));
        };
        let algorithm = match algorithm {
            "sha256" => DigestAlgorithm::Sha256,
            "sha512" => DigestAlgorithm::Sha512,
            _ => return Err(DigestError::UnsupportedAlgorithm(value.to_string())),
        };
        let valid_hex = encoded.len() == algorithm.hex_len()
            && encoded.bytes().all(|byte| matches!(byte, b'0'..=b'9' | b'a'..=b'f'));
        if !valid_hex {
            return Err(DigestError::InvalidEncoding(value.to_string()));
        }
        Ok(Self {
            algorithm,
            encoded: encoded.to_string(),
        })
    }

    /// Returns the digest algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Returns the hex-encoded portion.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Returns true when `bytes` hash to this digest.
    #[must_use]
    pub fn verifies(&self, bytes: &[u8]) -> bool {
        Self::compute(self.algorithm, bytes) == *self
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.as_str(), self.encoded)
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Digest {
    type Error = DigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(value: Digest) -> Self {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
