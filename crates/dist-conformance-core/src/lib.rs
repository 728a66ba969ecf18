// crates/dist-conformance-core/src/lib.rs
// ============================================================================
// Module: Distribution Conformance Core Library
// Description: Public API surface for the conformance engine.
// Purpose: Expose capability gating, fixtures, the probe and the suite runner.
// Dependencies: crate::{capability, debug, digest, discovery, error_codes,
//               fixtures, outcome, probe, suite}
// ============================================================================

//! ## Overview
//! The conformance engine drives a black-box artifact distribution endpoint
//! through ordered checks grouped by capability area. It owns test selection
//! (capability flags), deterministic fixtures, the pagination verifier and
//! the error-code taxonomy. HTTP itself sits behind the [`Transport`] trait.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod capability;
pub mod debug;
pub mod digest;
pub mod discovery;
pub mod error_codes;
pub mod fixtures;
pub mod outcome;
pub mod probe;
pub mod suite;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use capability::CapabilityArea;
pub use capability::CapabilityFlags;
pub use capability::CapabilitySignals;
pub use capability::ENABLED_SENTINEL;
pub use debug::DebugSink;
pub use debug::FileDebugSink;
pub use debug::HttpExchangeEvent;
pub use debug::NoopDebugSink;
pub use debug::StderrDebugSink;
pub use digest::Digest;
pub use digest::DigestAlgorithm;
pub use digest::DigestError;
pub use discovery::DiscoveryVerifier;
pub use discovery::TagList;
pub use error_codes::ErrorCode;
pub use error_codes::ErrorEnvelope;
pub use fixtures::ChunkedFixture;
pub use fixtures::Fixture;
pub use fixtures::FixtureError;
pub use fixtures::FixtureOverrides;
pub use fixtures::FixtureSet;
pub use outcome::CheckReport;
pub use outcome::StepError;
pub use outcome::StepOutcome;
pub use outcome::SuiteReport;
pub use probe::Method;
pub use probe::Probe;
pub use probe::ProbeError;
pub use probe::ProbeRequest;
pub use probe::ProbeResponse;
pub use probe::ResolvedRequest;
pub use probe::TargetKind;
pub use probe::Transport;
pub use probe::TransportError;
pub use suite::SetupPlan;
pub use suite::SuiteContext;
pub use suite::SuiteSettings;
pub use suite::run_suite;
