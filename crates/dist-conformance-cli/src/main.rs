// crates/dist-conformance-cli/src/main.rs
// ============================================================================
// Module: Distribution Conformance CLI Entry Point
// Description: Runs the conformance suite against a live endpoint.
// Purpose: Load configuration, execute checks and write reports.
// Dependencies: clap, dist-conformance-{cli, config, core}, thiserror
// ============================================================================

//! ## Overview
//! The binary reads every run input from `OCI_*` environment variables,
//! prints one line per check, writes the report artifacts and exits non-zero
//! when any check failed or the run could not start.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Parser;
use dist_conformance_cli::RunReport;
use dist_conformance_cli::check_line;
use dist_conformance_cli::execute;
use dist_conformance_cli::write_reports;
use dist_conformance_config::ConformanceConfig;
use dist_conformance_core::DebugSink;
use dist_conformance_core::FileDebugSink;
use dist_conformance_core::NoopDebugSink;
use dist_conformance_core::StepOutcome;
use dist_conformance_core::StderrDebugSink;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Definitions
// ============================================================================

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "dist-conformance", disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue)]
    show_version: bool,
    /// Directory receiving `report.json` and `report.md`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    report_dir: PathBuf,
    /// Append HTTP exchange records to this file instead of stderr.
    #[arg(long, value_name = "FILE")]
    debug_log: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes one conformance run.
fn run(cli: Cli) -> CliResult<ExitCode> {
    if cli.show_version {
        write_stdout_line(&format!("dist-conformance {}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = ConformanceConfig::load()
        .map_err(|err| CliError::new(format!("invalid configuration: {err}")))?;
    let sink = debug_sink(&cli, &config)?;
    let suite = execute(&config, sink)
        .map_err(|err| CliError::new(format!("conformance run aborted: {err}")))?;
    let report = RunReport::new(&config, &suite);

    for check in &report.checks {
        if config.hide_skipped && matches!(check.outcome, StepOutcome::Skipped { .. }) {
            continue;
        }
        write_stdout_line(&check_line(check))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    let paths = write_reports(&cli.report_dir, &report, config.hide_skipped).map_err(|err| {
        CliError::new(format!("failed to write reports to {}: {err}", cli.report_dir.display()))
    })?;
    write_stdout_line(&format!(
        "{} passed, {} failed, {} skipped; report written to {}",
        report.totals.passed,
        report.totals.failed,
        report.totals.skipped,
        paths.json.display()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;

    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Selects where HTTP exchange records go.
fn debug_sink(cli: &Cli, config: &ConformanceConfig) -> CliResult<Arc<dyn DebugSink>> {
    if let Some(path) = &cli.debug_log {
        let sink = FileDebugSink::new(path).map_err(|err| {
            CliError::new(format!("failed to open debug log {}: {err}", path.display()))
        })?;
        return Ok(Arc::new(sink));
    }
    if config.debug {
        return Ok(Arc::new(StderrDebugSink));
    }
    Ok(Arc::new(NoopDebugSink))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
