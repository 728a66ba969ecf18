// crates/dist-conformance-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: In-memory transports and sinks for core tests.
// Purpose: Exercise the probe and verifiers without a network.
// Dependencies: dist-conformance-core, serde_json
// ============================================================================

//! ## Overview
//! [`RecordingTransport`] answers from a closure and keeps every resolved
//! request; [`TagServer`] implements just enough of the tag listing endpoint
//! to drive the discovery verifier, with switches for the server quirks the
//! verifier must catch.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::Mutex;

use dist_conformance_core::DebugSink;
use dist_conformance_core::HttpExchangeEvent;
use dist_conformance_core::Method;
use dist_conformance_core::Probe;
use dist_conformance_core::ProbeResponse;
use dist_conformance_core::ResolvedRequest;
use dist_conformance_core::Transport;
use dist_conformance_core::TransportError;
use serde_json::json;

// ============================================================================
// SECTION: Recording Transport
// ============================================================================

/// Shared log of requests seen by a transport.
pub type RequestLog = Rc<RefCell<Vec<ResolvedRequest>>>;

/// Response factory used by [`RecordingTransport`].
type Responder = Box<dyn Fn(&ResolvedRequest) -> Result<ProbeResponse, TransportError>>;

/// Transport that records requests and answers from a closure.
pub struct RecordingTransport {
    /// Requests seen so far.
    log: RequestLog,
    /// Answers each request.
    responder: Responder,
}

impl RecordingTransport {
    /// Creates a transport and returns it with its request log.
    pub fn new(
        responder: impl Fn(&ResolvedRequest) -> Result<ProbeResponse, TransportError> + 'static,
    ) -> (Self, RequestLog) {
        let log = RequestLog::default();
        (
            Self {
                log: Rc::clone(&log),
                responder: Box::new(responder),
            },
            log,
        )
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: &ResolvedRequest) -> Result<ProbeResponse, TransportError> {
        self.log.borrow_mut().push(request.clone());
        (self.responder)(request)
    }
}

/// Builds a probe over a transport that always answers `status` with `body`.
pub fn fixed_probe(status: u16, body: &'static str) -> (Probe, RequestLog) {
    let (transport, log) = RecordingTransport::new(move |_| {
        Ok(ProbeResponse::new(status, Vec::new(), body.as_bytes().to_vec()))
    });
    (Probe::new(Box::new(transport), "conformance/repo"), log)
}

// ============================================================================
// SECTION: Tag Server
// ============================================================================

/// Behaviour switches for [`TagServer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TagServerQuirks {
    /// Cap applied when `n` is absent.
    pub default_page_cap: Option<usize>,
    /// Resume at the cursor instead of after it.
    pub inclusive_cursor: bool,
    /// Return one tag fewer than requested by `n`.
    pub short_pages: bool,
}

/// In-memory tag listing endpoint.
pub struct TagServer {
    /// Tags in listing order.
    tags: Vec<String>,
    /// Enabled misbehaviours.
    quirks: TagServerQuirks,
}

impl TagServer {
    /// Creates a server holding `tags` in the given order.
    pub fn new(tags: &[&str], quirks: TagServerQuirks) -> Self {
        Self {
            tags: tags.iter().map(|tag| (*tag).to_string()).collect(),
            quirks,
        }
    }

    /// Returns a probe bound to this server.
    pub fn into_probe(self) -> (Probe, RequestLog) {
        let (transport, log) = RecordingTransport::new(move |request| Ok(self.respond(request)));
        (Probe::new(Box::new(transport), "conformance/repo"), log)
    }

    /// Answers a tag listing request.
    fn respond(&self, request: &ResolvedRequest) -> ProbeResponse {
        if request.method != Method::Get || !request.target.ends_with("/tags/list") {
            return ProbeResponse::new(404, Vec::new(), Vec::new());
        }
        let param = |name: &str| {
            request.query.iter().find(|(key, _)| key == name).map(|(_, value)| value.clone())
        };
        let start = match param("last") {
            Some(last) => match self.tags.iter().position(|tag| *tag == last) {
                Some(index) if self.quirks.inclusive_cursor => index,
                Some(index) => index + 1,
                None => self.tags.len(),
            },
            None => 0,
        };
        let remaining = &self.tags[start.min(self.tags.len())..];
        let limit = match param("n").and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if self.quirks.short_pages => n.saturating_sub(1),
            Some(n) => n,
            None => self.quirks.default_page_cap.unwrap_or(remaining.len()),
        };
        let page: Vec<&String> = remaining.iter().take(limit).collect();
        let body = json!({"name": "conformance/repo", "tags": page});
        ProbeResponse::new(
            200,
            vec![("Content-Type".to_string(), "application/json".to_string())],
            body.to_string().into_bytes(),
        )
    }
}

// ============================================================================
// SECTION: Capture Sink
// ============================================================================

/// Debug sink that keeps events in memory.
#[derive(Default)]
pub struct CaptureSink {
    /// Recorded events.
    events: Mutex<Vec<HttpExchangeEvent>>,
}

impl CaptureSink {
    /// Creates an empty shared sink.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns recorded events.
    pub fn events(&self) -> Vec<HttpExchangeEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl DebugSink for CaptureSink {
    fn record(&self, event: &HttpExchangeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
