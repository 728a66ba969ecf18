// crates/dist-conformance-config/src/env.rs
// ============================================================================
// Module: Conformance Environment
// Description: Environment keys, typed configuration and parsing helpers.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: dist-conformance-core, thiserror
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement; invalid
//! UTF-8 fails closed. Required values must hold more than whitespace.
//! Optional overrides that are set to the empty string are treated as absent,
//! so an exported-but-empty variable never suppresses a setup step. Any other
//! value counts as supplied, even one made of whitespace or separators.
//!
//! Capability signals are the exception: their raw value is kept verbatim,
//! including an empty string, because the skip diagnostic echoes it back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use dist_conformance_core::CapabilityArea;
use dist_conformance_core::CapabilityFlags;
use dist_conformance_core::CapabilitySignals;
use dist_conformance_core::ENABLED_SENTINEL;
use dist_conformance_core::FixtureOverrides;
use dist_conformance_core::SetupPlan;
use dist_conformance_core::SuiteSettings;
use dist_conformance_core::suite::DEFAULT_TAG_NAME;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Transport timeout used when no override is configured.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Separator between entries of the tag list override.
const TAG_LIST_SEPARATOR: char = ',';

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys read by the conformance engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConformanceEnv {
    /// Endpoint root URL (required).
    RootUrl,
    /// Default repository namespace (required).
    Namespace,
    /// Basic auth username.
    Username,
    /// Basic auth password.
    Password,
    /// Mirror HTTP exchanges when set to the sentinel.
    Debug,
    /// Capability area toggle.
    Capability(CapabilityArea),
    /// Config blob digest override.
    BlobDigest,
    /// Manifest digest override.
    ManifestDigest,
    /// Tag used by pull checks.
    TagName,
    /// Comma-separated tags expected to exist already.
    TagList,
    /// Omit skipped checks from rendered reports when set to the sentinel.
    HideSkippedWorkflows,
    /// Transport timeout in seconds (positive integer).
    HttpTimeoutSeconds,
}

impl ConformanceEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RootUrl => "OCI_ROOT_URL",
            Self::Namespace => "OCI_NAMESPACE",
            Self::Username => "OCI_USERNAME",
            Self::Password => "OCI_PASSWORD",
            Self::Debug => "OCI_DEBUG",
            Self::Capability(area) => area.signal_name(),
            Self::BlobDigest => "OCI_BLOB_DIGEST",
            Self::ManifestDigest => "OCI_MANIFEST_DIGEST",
            Self::TagName => "OCI_TAG_NAME",
            Self::TagList => "OCI_TAG_LIST",
            Self::HideSkippedWorkflows => "OCI_HIDE_SKIPPED_WORKFLOWS",
            Self::HttpTimeoutSeconds => "OCI_HTTP_TIMEOUT_SEC",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable holds invalid UTF-8.
    #[error("{0} must be valid UTF-8")]
    InvalidUtf8(&'static str),
    /// A required variable is unset or empty.
    #[error("{0} must be set to a non-empty value")]
    Missing(&'static str),
    /// A timeout value is not a positive integer.
    #[error("{name} must be a positive integer number of seconds, got `{value}`")]
    InvalidTimeout {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed conformance configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceConfig {
    /// Endpoint root URL.
    pub root_url: String,
    /// Default repository namespace.
    pub namespace: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Mirror HTTP exchanges to the debug sink.
    pub debug: bool,
    /// Raw capability signals.
    pub signals: CapabilitySignals,
    /// Fixture digest overrides.
    pub overrides: FixtureOverrides,
    /// Tag override for pull checks.
    pub tag_name: Option<String>,
    /// Tags expected to exist already; `Some` whenever the override is set,
    /// even when it names no tags.
    pub tag_list: Option<Vec<String>>,
    /// Omit skipped checks from rendered reports.
    pub hide_skipped: bool,
    /// Transport timeout.
    pub timeout: Duration,
}

impl ConformanceConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is not valid UTF-8, a required
    /// value is missing, or the timeout fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| read_env_strict(key.as_str()))
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] under the same conditions as [`Self::load`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(ConformanceEnv) -> Result<Option<String>, ConfigError>,
    {
        let optional = |key: ConformanceEnv| -> Result<Option<String>, ConfigError> {
            Ok(lookup(key)?.filter(|value| !value.is_empty()))
        };
        let required = |key: ConformanceEnv| -> Result<String, ConfigError> {
            optional(key)?
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key.as_str()))
        };
        let sentinel = |key: ConformanceEnv| -> Result<bool, ConfigError> {
            Ok(lookup(key)?.as_deref() == Some(ENABLED_SENTINEL))
        };

        let signals = CapabilityArea::ALL.into_iter().try_fold(
            CapabilitySignals::new(),
            |signals, area| -> Result<CapabilitySignals, ConfigError> {
                Ok(signals.with(area, lookup(ConformanceEnv::Capability(area))?))
            },
        )?;
        let timeout = optional(ConformanceEnv::HttpTimeoutSeconds)?
            .map(|raw| parse_timeout_seconds(ConformanceEnv::HttpTimeoutSeconds.as_str(), &raw))
            .transpose()?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT);

        Ok(Self {
            root_url: required(ConformanceEnv::RootUrl)?,
            namespace: required(ConformanceEnv::Namespace)?,
            username: optional(ConformanceEnv::Username)?,
            password: optional(ConformanceEnv::Password)?,
            debug: sentinel(ConformanceEnv::Debug)?,
            signals,
            overrides: FixtureOverrides {
                blob_digest: optional(ConformanceEnv::BlobDigest)?,
                manifest_digest: optional(ConformanceEnv::ManifestDigest)?,
            },
            tag_name: optional(ConformanceEnv::TagName)?,
            tag_list: optional(ConformanceEnv::TagList)?.map(|raw| parse_tag_list(&raw)),
            hide_skipped: sentinel(ConformanceEnv::HideSkippedWorkflows)?,
            timeout,
        })
    }

    /// Resolves the capability bitmask.
    #[must_use]
    pub fn capability_flags(&self) -> CapabilityFlags {
        CapabilityFlags::resolve(self.signals.clone())
    }

    /// Returns the fixture digest overrides.
    #[must_use]
    pub fn fixture_overrides(&self) -> FixtureOverrides {
        self.overrides.clone()
    }

    /// Derives the suite settings, including which setup steps run.
    #[must_use]
    pub fn suite_settings(&self) -> SuiteSettings {
        SuiteSettings {
            tag_name: self.tag_name.clone().unwrap_or_else(|| DEFAULT_TAG_NAME.to_string()),
            tag_list: self.tag_list.clone().unwrap_or_default(),
            setup: SetupPlan::from_overrides(
                self.tag_name.as_deref(),
                self.overrides.manifest_digest.as_deref(),
                self.overrides.blob_digest.as_deref(),
                self.tag_list.as_deref(),
            ),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUtf8`] when the variable contains invalid
/// UTF-8.
pub fn read_env_strict(name: &'static str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| ConfigError::InvalidUtf8(name))
    })
}

/// Parses a positive timeout value.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidTimeout`] when the value is non-numeric or
/// zero.
fn parse_timeout_seconds(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidTimeout {
        name,
        value: raw.to_string(),
    };
    let secs: u64 = raw.trim().parse().map_err(|_| invalid())?;
    if secs == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs(secs))
}

/// Splits the tag list override, dropping blank entries.
fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(TAG_LIST_SEPARATOR)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
