// crates/dist-conformance-cli/src/report.rs
// ============================================================================
// Module: Run Reports
// Description: Canonical JSON and markdown artifacts for a conformance run.
// Purpose: Persist deterministic, reviewable results.
// Dependencies: dist-conformance-{core, config}, serde, serde_jcs
// ============================================================================

//! ## Overview
//! `report.json` is the complete record in RFC 8785 canonical form, so two
//! runs with identical outcomes produce identical bytes. `report.md` and the
//! console lines are the rendered views; they omit skipped checks when the
//! operator asked to hide them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use dist_conformance_config::ConformanceConfig;
use dist_conformance_core::CapabilityArea;
use dist_conformance_core::CheckReport;
use dist_conformance_core::StepOutcome;
use dist_conformance_core::SuiteReport;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the canonical JSON report.
pub const JSON_REPORT_NAME: &str = "report.json";

/// File name of the markdown summary.
pub const MARKDOWN_REPORT_NAME: &str = "report.md";

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Outcome totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Passed checks.
    pub passed: usize,
    /// Failed checks.
    pub failed: usize,
    /// Skipped checks.
    pub skipped: usize,
}

/// Serialized run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Engine version.
    pub version: String,
    /// Endpoint root URL.
    pub root_url: String,
    /// Repository namespace.
    pub namespace: String,
    /// Areas enabled for the run.
    pub enabled_areas: Vec<CapabilityArea>,
    /// Outcome totals.
    pub totals: Totals,
    /// Per-check outcomes in execution order.
    pub checks: Vec<CheckReport>,
}

impl RunReport {
    /// Builds a report for a finished run.
    #[must_use]
    pub fn new(config: &ConformanceConfig, suite: &SuiteReport) -> Self {
        let flags = config.capability_flags();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            root_url: config.root_url.clone(),
            namespace: config.namespace.clone(),
            enabled_areas: CapabilityArea::ALL
                .into_iter()
                .filter(|area| flags.is_enabled(*area))
                .collect(),
            totals: Totals {
                passed: suite.passed(),
                failed: suite.failed(),
                skipped: suite.skipped(),
            },
            checks: suite.checks.clone(),
        }
    }

    /// Returns true when no check failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.totals.failed == 0
    }
}

/// Paths of written report artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// Canonical JSON report.
    pub json: PathBuf,
    /// Markdown summary.
    pub markdown: PathBuf,
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders one console line for a check.
#[must_use]
pub fn check_line(check: &CheckReport) -> String {
    match &check.outcome {
        StepOutcome::Failed {
            message,
        } => format!("[{}] {}: {} ({message})", check.outcome.label(), check.area, check.name),
        _ => format!("[{}] {}: {}", check.outcome.label(), check.area, check.name),
    }
}

/// Renders the markdown summary.
#[must_use]
pub fn summary_markdown(report: &RunReport, hide_skipped: bool) -> String {
    let mut out = String::new();
    out.push_str("# Distribution Conformance Report\n\n");
    out.push_str("## Run\n\n");
    let _ = writeln!(out, "- Version: {}", report.version);
    let _ = writeln!(out, "- Endpoint: {}", report.root_url);
    let _ = writeln!(out, "- Namespace: {}", report.namespace);
    let _ = writeln!(
        out,
        "- Result: {} passed, {} failed, {} skipped",
        report.totals.passed, report.totals.failed, report.totals.skipped
    );
    for area in CapabilityArea::ALL {
        let checks: Vec<&CheckReport> = report
            .checks
            .iter()
            .filter(|check| check.area == area)
            .filter(|check| !(hide_skipped && check.outcome.label() == "skip"))
            .collect();
        if checks.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n## {area}\n");
        for check in checks {
            let _ = writeln!(out, "- [{}] {}", check.outcome.label(), check.name);
            match &check.outcome {
                StepOutcome::Passed => {}
                StepOutcome::Failed {
                    message,
                } => {
                    let _ = writeln!(out, "  - {message}");
                }
                StepOutcome::Skipped {
                    reason,
                } => {
                    for line in reason.lines() {
                        let _ = writeln!(out, "  - {}", line.trim());
                    }
                }
            }
        }
    }
    out
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

/// Writes `report.json` and `report.md` into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns an error when the directory or either file cannot be written, or
/// the report cannot be canonicalized.
pub fn write_reports(
    dir: &Path,
    report: &RunReport,
    hide_skipped: bool,
) -> io::Result<ReportPaths> {
    fs::create_dir_all(dir)?;
    let json = dir.join(JSON_REPORT_NAME);
    let bytes = serde_jcs::to_vec(report).map_err(|err| io::Error::other(err.to_string()))?;
    fs::write(&json, bytes)?;
    let markdown = dir.join(MARKDOWN_REPORT_NAME);
    fs::write(&markdown, summary_markdown(report, hide_skipped).as_bytes())?;
    Ok(ReportPaths {
        json,
        markdown,
    })
}
