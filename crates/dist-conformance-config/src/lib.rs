// crates/dist-conformance-config/src/lib.rs
// ============================================================================
// Module: Distribution Conformance Configuration
// Description: Environment-backed run configuration.
// Purpose: Load the operator's signals once into an immutable typed struct.
// Dependencies: dist-conformance-core, thiserror
// ============================================================================

//! ## Overview
//! Every input to a conformance run arrives as an environment signal. This
//! crate reads them with strict UTF-8 enforcement and maps them into a
//! [`ConformanceConfig`], from which the capability flags, fixture overrides
//! and suite settings are derived. Nothing re-reads the environment after
//! [`ConformanceConfig::load`] returns.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::ConfigError;
pub use env::ConformanceConfig;
pub use env::ConformanceEnv;
pub use env::DEFAULT_HTTP_TIMEOUT;
pub use env::read_env_strict;
