// crates/dist-conformance-core/src/debug.rs
// ============================================================================
// Module: HTTP Debug Sink
// Description: Structured records of every request/response exchange.
// Purpose: Mirror probe traffic for diagnosis without affecting outcomes.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! When debug logging is enabled the probe hands every exchange to a
//! [`DebugSink`]. Sinks are write-only from the engine's side: write failures
//! are swallowed and nothing recorded here feeds back into a check.
//! Authorization header values never reach a sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of body bytes echoed into a record.
pub const MAX_BODY_PREVIEW_BYTES: usize = 512;

/// Replacement for redacted header values.
const REDACTED: &str = "<redacted>";

// ============================================================================
// SECTION: Types
// ============================================================================

/// One request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpExchangeEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Per-probe exchange sequence number.
    pub sequence: u64,
    /// HTTP method.
    pub method: &'static str,
    /// Resolved request path or location.
    pub target: String,
    /// Query parameters in request order.
    pub query: Vec<(String, String)>,
    /// Request headers with credentials redacted.
    pub request_headers: Vec<(String, String)>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response status when the exchange completed.
    pub status: Option<u16>,
    /// Response headers.
    pub response_headers: Vec<(String, String)>,
    /// Response body size in bytes.
    pub response_bytes: usize,
    /// Lossy UTF-8 prefix of the response body.
    pub response_preview: String,
    /// Transport error when the exchange did not complete.
    pub error: Option<String>,
}

impl HttpExchangeEvent {
    /// Creates an exchange record stamped with the current time.
    #[must_use]
    pub fn new(sequence: u64, method: &'static str, target: String) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "http_exchange",
            timestamp_ms,
            sequence,
            method,
            target,
            query: Vec::new(),
            request_headers: Vec::new(),
            request_bytes: 0,
            status: None,
            response_headers: Vec::new(),
            response_bytes: 0,
            response_preview: String::new(),
            error: None,
        }
    }
}

/// Returns headers with authorization values replaced.
#[must_use]
pub fn redact_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case("authorization") {
                (name.clone(), REDACTED.to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}

/// Returns a bounded lossy UTF-8 preview of a body.
#[must_use]
pub fn body_preview(body: &[u8]) -> String {
    let end = body.len().min(MAX_BODY_PREVIEW_BYTES);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Write-only destination for exchange records.
pub trait DebugSink: Send + Sync {
    /// Records an exchange.
    fn record(&self, event: &HttpExchangeEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct StderrDebugSink;

impl DebugSink for StderrDebugSink {
    fn record(&self, event: &HttpExchangeEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileDebugSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileDebugSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DebugSink for FileDebugSink {
    fn record(&self, event: &HttpExchangeEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op sink used when debug logging is disabled.
pub struct NoopDebugSink;

impl DebugSink for NoopDebugSink {
    fn record(&self, _event: &HttpExchangeEvent) {}
}
