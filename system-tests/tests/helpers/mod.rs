// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for conformance system-tests.
// Purpose: Provide the registry stub and run harness.
// Dependencies: system-tests, dist-conformance-{cli, config, core}, tiny_http
// ============================================================================

//! ## Overview
//! Shared helpers for conformance system-tests.
//! Invariants:
//! - Every scenario runs against its own stub on an ephemeral port.
//! - Reports are written under the per-scenario run directory.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod registry_stub;
