// system-tests/src/lib.rs
// ============================================================================
// Module: Distribution Conformance System Tests Library
// Description: Output handling shared by the end-to-end scenarios.
// Purpose: Give every scenario a directory for its reports and debug log.
// Dependencies: dist-conformance-{cli, config, core}
// ============================================================================

//! ## Overview
//! The end-to-end binaries in `system-tests/tests` drive the full conformance
//! run against an in-process registry stub. This library owns where each
//! scenario's reports land; see [`run_dir`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod run_dir;


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use run_dir::RunDir;
pub use run_dir::RunDirError;
pub use run_dir::RunDirSettings;
pub use run_dir::ScenarioOutcome;
