// crates/dist-conformance-cli/src/runner.rs
// ============================================================================
// Module: Conformance Run
// Description: Builds every run input and executes the suite once.
// Purpose: Fail fatally on setup problems before any check is issued.
// Dependencies: dist-conformance-{core, config, transport}, thiserror
// ============================================================================

//! ## Overview
//! Setup order is fixed: fixtures first (a malformed override aborts the
//! run), then the transport, then the probe with its debug sink. Only once
//! all of them exist does the first check run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dist_conformance_config::ConformanceConfig;
use dist_conformance_core::DebugSink;
use dist_conformance_core::FixtureError;
use dist_conformance_core::FixtureSet;
use dist_conformance_core::Probe;
use dist_conformance_core::SuiteContext;
use dist_conformance_core::SuiteReport;
use dist_conformance_core::TransportError;
use dist_conformance_core::run_suite;
use dist_conformance_transport::HttpTransport;
use dist_conformance_transport::HttpTransportConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal errors raised before any check runs.
#[derive(Debug, Error)]
pub enum RunError {
    /// Fixture construction failed.
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    /// The transport could not be constructed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Runs the full suite against the configured endpoint.
///
/// # Errors
///
/// Returns [`RunError`] when fixtures or the transport cannot be built.
/// Check failures are not errors; they are recorded in the report.
pub fn execute(
    config: &ConformanceConfig,
    sink: Arc<dyn DebugSink>,
) -> Result<SuiteReport, RunError> {
    let fixtures = FixtureSet::build(&config.fixture_overrides())?;
    let transport = HttpTransport::new(&HttpTransportConfig {
        root_url: config.root_url.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
        timeout: config.timeout,
    })?;
    let probe = Probe::new(Box::new(transport), config.namespace.clone()).with_debug_sink(sink);
    let flags = config.capability_flags();
    let settings = config.suite_settings();
    Ok(run_suite(&SuiteContext {
        probe: &probe,
        fixtures: &fixtures,
        flags: &flags,
        settings: &settings,
    }))
}
