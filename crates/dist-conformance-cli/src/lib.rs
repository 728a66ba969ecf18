// crates/dist-conformance-cli/src/lib.rs
// ============================================================================
// Module: Distribution Conformance CLI Library
// Description: Run orchestration and report rendering behind the binary.
// Purpose: Keep the binary thin and the run path reusable from tests.
// Dependencies: dist-conformance-{core, config, transport}, serde, serde_jcs
// ============================================================================

//! ## Overview
//! [`runner::execute`] wires configuration, fixtures, the HTTP transport and
//! the suite together; [`report`] turns the resulting suite report into the
//! canonical JSON and markdown artifacts plus per-check console lines.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod report;
pub mod runner;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use report::JSON_REPORT_NAME;
pub use report::MARKDOWN_REPORT_NAME;
pub use report::ReportPaths;
pub use report::RunReport;
pub use report::check_line;
pub use report::summary_markdown;
pub use report::write_reports;
pub use runner::RunError;
pub use runner::execute;
