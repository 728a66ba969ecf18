// system-tests/src/run_dir.rs
// ============================================================================
// Module: Scenario Run Directories
// Description: Per-scenario output directories for end-to-end conformance runs.
// Purpose: Keep the reports, debug log and failure digest of every scenario.
// Dependencies: dist-conformance-{cli, config, core}, serde, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! Each end-to-end scenario writes into its own directory under a shared run
//! root: the CLI's `report.json`/`report.md`, an optional `exchanges.jsonl`
//! debug log, and `outcome.json`, a canonical digest of the failed checks so a
//! broken run can be diagnosed without re-reading the full report.
//!
//! The run root defaults to `target/system-tests/run_<ms>` and may be pinned
//! with [`RUN_ROOT_ENV`]. A pinned root is only reused when [`REUSE_ENV`] is
//! set to the enabled sentinel, mirroring how the engine reads its own flags.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use dist_conformance_cli::ReportPaths;
use dist_conformance_cli::RunReport;
use dist_conformance_cli::write_reports;
use dist_conformance_config::ConfigError;
use dist_conformance_config::read_env_strict;
use dist_conformance_core::CapabilityArea;
use dist_conformance_core::ENABLED_SENTINEL;
use dist_conformance_core::StepOutcome;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Pins the run root shared by every scenario.
pub const RUN_ROOT_ENV: &str = "DIST_CONFORMANCE_SYSTEM_TEST_RUN_ROOT";
/// Allows scenario directories from an earlier run to be overwritten.
pub const REUSE_ENV: &str = "DIST_CONFORMANCE_SYSTEM_TEST_REUSE_RUN_ROOT";
/// Debug log file name inside a scenario directory.
pub const DEBUG_LOG_NAME: &str = "exchanges.jsonl";
/// Failure digest file name inside a scenario directory.
pub const OUTCOME_NAME: &str = "outcome.json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while preparing or writing a scenario directory.
#[derive(Debug, Error)]
pub enum RunDirError {
    /// A setting could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The scenario directory exists and reuse is not enabled.
    #[error(
        "{} already exists; set DIST_CONFORMANCE_SYSTEM_TEST_REUSE_RUN_ROOT=1 to overwrite it",
        .0.display()
    )]
    Exists(PathBuf),
    /// Filesystem or serialization failure.
    #[error("scenario output failed: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Where scenario directories live.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunDirSettings {
    /// Pinned run root; a fresh timestamped root is used when absent.
    pub root: Option<PathBuf>,
    /// Overwrite scenario directories that already exist.
    pub reuse: bool,
}

impl RunDirSettings {
    /// Reads the settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUtf8`] when a value is not UTF-8.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(read_env_strict)
    }

    /// Reads the settings through an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns whatever the lookup returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<Option<String>, ConfigError>,
    {
        Ok(Self {
            root: lookup(RUN_ROOT_ENV)?.filter(|value| !value.is_empty()).map(PathBuf::from),
            reuse: lookup(REUSE_ENV)?.as_deref() == Some(ENABLED_SENTINEL),
        })
    }

    /// Returns the directory for `scenario`.
    #[must_use]
    pub fn scenario_path(&self, scenario: &str) -> PathBuf {
        let root = self.root.clone().unwrap_or_else(|| {
            let stamp =
                SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
            PathBuf::from("target/system-tests").join(format!("run_{stamp}"))
        });
        root.join(scenario)
    }
}

// ============================================================================
// SECTION: Outcome Digest
// ============================================================================

/// One failed check in the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCheck {
    /// Area the check belongs to.
    pub area: CapabilityArea,
    /// Check description.
    pub check: String,
    /// Expected-versus-actual message.
    pub message: String,
}

/// Canonical digest of a scenario's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario name.
    pub scenario: String,
    /// Areas the run enabled.
    pub enabled_areas: Vec<CapabilityArea>,
    /// Passed checks.
    pub passed: usize,
    /// Failed checks.
    pub failed: usize,
    /// Skipped checks.
    pub skipped: usize,
    /// Every failed check, in execution order.
    pub failures: Vec<FailedCheck>,
}

impl ScenarioOutcome {
    /// Digests a finished run.
    #[must_use]
    pub fn new(scenario: &str, report: &RunReport) -> Self {
        let failures = report
            .checks
            .iter()
            .filter_map(|check| match &check.outcome {
                StepOutcome::Failed {
                    message,
                } => Some(FailedCheck {
                    area: check.area,
                    check: check.name.clone(),
                    message: message.clone(),
                }),
                _ => None,
            })
            .collect();
        Self {
            scenario: scenario.to_string(),
            enabled_areas: report.enabled_areas.clone(),
            passed: report.totals.passed,
            failed: report.totals.failed,
            skipped: report.totals.skipped,
            failures,
        }
    }
}

// ============================================================================
// SECTION: Scenario Directory
// ============================================================================

/// Files written for a recorded scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedScenario {
    /// Report files from the CLI renderer.
    pub reports: ReportPaths,
    /// Failure digest.
    pub outcome: PathBuf,
}

/// Output directory of one scenario.
#[derive(Debug, Clone)]
pub struct RunDir {
    /// Scenario name.
    scenario: String,
    /// Directory holding every file of the scenario.
    path: PathBuf,
}

impl RunDir {
    /// Creates the directory for `scenario`.
    ///
    /// # Errors
    ///
    /// Returns [`RunDirError::Exists`] when the directory is already present
    /// and reuse is off, or [`RunDirError::Io`] when it cannot be created.
    pub fn create(settings: &RunDirSettings, scenario: &str) -> Result<Self, RunDirError> {
        let path = settings.scenario_path(scenario);
        if path.exists() && !settings.reuse {
            return Err(RunDirError::Exists(path));
        }
        fs::create_dir_all(&path)?;
        Ok(Self {
            scenario: scenario.to_string(),
            path,
        })
    }

    /// Returns the scenario directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns where the scenario's debug log belongs.
    #[must_use]
    pub fn debug_log(&self) -> PathBuf {
        self.path.join(DEBUG_LOG_NAME)
    }

    /// Writes the CLI reports and the failure digest for a finished run.
    ///
    /// # Errors
    ///
    /// Returns [`RunDirError::Io`] when a file cannot be written.
    pub fn record(
        &self,
        report: &RunReport,
        hide_skipped: bool,
    ) -> Result<RecordedScenario, RunDirError> {
        let reports = write_reports(&self.path, report, hide_skipped)?;
        let outcome = self.path.join(OUTCOME_NAME);
        let bytes = serde_jcs::to_vec(&ScenarioOutcome::new(&self.scenario, report))
            .map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(&outcome, bytes)?;
        Ok(RecordedScenario {
            reports,
            outcome,
        })
    }
}
