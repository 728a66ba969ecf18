// crates/dist-conformance-core/src/probe.rs
// ============================================================================
// Module: Protocol Probe
// Description: Request builder, transport seam and normalized responses.
// Purpose: Issue templated protocol requests against a black-box endpoint.
// Dependencies: serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! Checks describe requests as a method plus a path template with `<name>`,
//! `<reference>` and `<digest>` placeholders. The [`Probe`] binds the default
//! namespace, executes the request through a [`Transport`] and hands back a
//! [`ProbeResponse`]. The probe never retries and never interprets status
//! codes; that is the calling check's job.
//!
//! Server-issued `Location` values are URI references. A transport that knows
//! the URL it requested stamps it on the response, and
//! [`ProbeResponse::location`] resolves the header against it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::debug::DebugSink;
use crate::debug::HttpExchangeEvent;
use crate::debug::NoopDebugSink;
use crate::debug::body_preview;
use crate::debug::redact_headers;
use crate::outcome::StepError;

// ============================================================================
// SECTION: Path Templates
// ============================================================================

/// Manifest by tag or digest.
pub const MANIFEST_PATH: &str = "/v2/<name>/manifests/<reference>";
/// Blob by digest.
pub const BLOB_PATH: &str = "/v2/<name>/blobs/<digest>";
/// Upload session creation.
pub const BLOB_UPLOADS_PATH: &str = "/v2/<name>/blobs/uploads/";
/// Tag listing.
pub const TAGS_LIST_PATH: &str = "/v2/<name>/tags/list";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while resolving a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The template names a placeholder the probe does not know.
    #[error("unknown placeholder <{0}> in path template")]
    UnknownPlaceholder(String),
    /// A placeholder has no bound value.
    #[error("placeholder <{0}> has no bound value")]
    UnboundPlaceholder(&'static str),
    /// A `<` has no closing `>`.
    #[error("unterminated placeholder in path template `{0}`")]
    Unterminated(String),
}

/// Errors raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(String),
    /// The request target does not form a valid URL.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    /// The request could not be sent.
    #[error("http request failed: {0}")]
    Request(String),
    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// HTTP methods used by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// HEAD.
    Head,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl Method {
    /// Returns the method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// How a transport interprets [`ResolvedRequest::target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Path appended to the endpoint root, keeping any root path prefix.
    Path,
    /// Server-issued URI reference, resolved against the endpoint root when
    /// it is not already absolute.
    Location,
}

/// Where a request is aimed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RequestTarget {
    /// Path template resolved against bindings.
    Template(String),
    /// Server-issued location used verbatim.
    Location(String),
}

/// Request description built by a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// HTTP method.
    method: Method,
    /// Template or location.
    target: RequestTarget,
    /// Namespace override for `<name>`.
    name: Option<String>,
    /// Value for `<reference>`.
    reference: Option<String>,
    /// Value for `<digest>`.
    digest: Option<String>,
    /// Headers in insertion order.
    headers: Vec<(String, String)>,
    /// Query parameters in insertion order.
    query: Vec<(String, String)>,
    /// Request body.
    body: Vec<u8>,
}

impl ProbeRequest {
    /// Starts a request against a path template.
    #[must_use]
    pub fn new(method: Method, template: &str) -> Self {
        Self::with_target(method, RequestTarget::Template(template.to_string()))
    }

    /// Starts a request against a server-issued location.
    #[must_use]
    pub fn location(method: Method, location: &str) -> Self {
        Self::with_target(method, RequestTarget::Location(location.to_string()))
    }

    /// Shared constructor.
    const fn with_target(method: Method, target: RequestTarget) -> Self {
        Self {
            method,
            target,
            name: None,
            reference: None,
            digest: None,
            headers: Vec::new(),
            query: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Overrides the default namespace for `<name>`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Binds `<reference>`.
    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Binds `<digest>`.
    #[must_use]
    pub fn digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Resolves placeholders against `namespace` unless overridden.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] for unknown, unbound or unterminated
    /// placeholders.
    pub fn resolve(&self, namespace: &str) -> Result<ResolvedRequest, ProbeError> {
        let (kind, target) = match &self.target {
            RequestTarget::Location(location) => (TargetKind::Location, location.clone()),
            RequestTarget::Template(template) => {
                let name = self.name.as_deref().unwrap_or(namespace);
                let resolved = resolve_template(template, |placeholder| match placeholder {
                    "name" => Ok(Some(name)),
                    "reference" => Ok(self.reference.as_deref()),
                    "digest" => Ok(self.digest.as_deref()),
                    other => Err(ProbeError::UnknownPlaceholder(other.to_string())),
                })?;
                (TargetKind::Path, resolved)
            }
        };
        Ok(ResolvedRequest {
            method: self.method,
            kind,
            target,
            headers: self.headers.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
        })
    }
}

/// Substitutes every `<placeholder>` in `template`.
fn resolve_template<'a>(
    template: &str,
    lookup: impl Fn(&str) -> Result<Option<&'a str>, ProbeError>,
) -> Result<String, ProbeError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('>').ok_or_else(|| ProbeError::Unterminated(template.to_string()))?;
        let placeholder = &after[..close];
        let value = lookup(placeholder)?.ok_or(match placeholder {
            "name" => ProbeError::UnboundPlaceholder("name"),
            "reference" => ProbeError::UnboundPlaceholder("reference"),
            _ => ProbeError::UnboundPlaceholder("digest"),
        })?;
        out.push_str(value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Fully bound request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// HTTP method.
    pub method: Method,
    /// Whether `target` is a templated path or a server-issued location.
    pub kind: TargetKind,
    /// Path relative to the endpoint root, or a server-issued location.
    pub target: String,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Query parameters appended after any already in `target`.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: Vec<u8>,
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Normalized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// Status code.
    status: u16,
    /// Headers with lowercased names.
    headers: Vec<(String, String)>,
    /// Raw body.
    body: Vec<u8>,
    /// URL the response was served from, when the transport knows it.
    url: Option<String>,
}

impl ProbeResponse {
    /// Creates a response; header names are lowercased for lookup.
    #[must_use]
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        let headers =
            headers.into_iter().map(|(name, value)| (name.to_ascii_lowercase(), value)).collect();
        Self {
            status,
            headers,
            body,
            url: None,
        }
    }

    /// Records the URL the response was served from.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Returns the URL the response was served from.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the first value of a header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }

    /// Returns all headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] with the raw body when decoding fails.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, StepError> {
        serde_json::from_slice(&self.body).map_err(|err| {
            StepError::Failed(format!(
                "invalid json body ({err}): {}",
                String::from_utf8_lossy(&self.body)
            ))
        })
    }

    /// Asserts the status is one of `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] naming expected and actual statuses.
    pub fn expect_status(&self, expected: &[u16]) -> Result<(), StepError> {
        if expected.contains(&self.status) {
            return Ok(());
        }
        Err(StepError::Failed(format!(
            "status: expected one of {expected:?}, got {} (body: {})",
            self.status,
            body_preview(&self.body)
        )))
    }

    /// Returns a header that must be present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] when the header is absent or empty.
    pub fn require_header(&self, name: &str) -> Result<&str, StepError> {
        match self.header(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(StepError::Failed(format!("header {name}: expected a value, got none"))),
        }
    }

    /// Returns the `Location` header resolved against the response URL.
    ///
    /// Without a recorded URL the header is returned verbatim and the
    /// transport resolves it against the endpoint root.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] when the header is absent or does not
    /// resolve to a URL.
    pub fn location(&self) -> Result<String, StepError> {
        let location = self.require_header("Location")?;
        let Some(base) = &self.url else {
            return Ok(location.to_string());
        };
        Url::parse(base).and_then(|base| base.join(location)).map(String::from).map_err(|err| {
            StepError::Failed(format!("header Location: {location:?} does not resolve ({err})"))
        })
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// External HTTP transport.
pub trait Transport {
    /// Executes a resolved request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the exchange cannot complete.
    fn execute(&self, request: &ResolvedRequest) -> Result<ProbeResponse, TransportError>;
}

// ============================================================================
// SECTION: Probe
// ============================================================================

/// Request executor bound to a namespace and debug sink.
pub struct Probe {
    /// Transport used for every exchange.
    transport: Box<dyn Transport>,
    /// Default value for `<name>`.
    namespace: String,
    /// Exchange mirror.
    sink: Arc<dyn DebugSink>,
    /// Next exchange sequence number.
    sequence: AtomicU64,
}

impl Probe {
    /// Creates a probe with debug mirroring disabled.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, namespace: impl Into<String>) -> Self {
        Self {
            transport,
            namespace: namespace.into(),
            sink: Arc::new(NoopDebugSink),
            sequence: AtomicU64::new(0),
        }
    }

    /// Mirrors every exchange to `sink`.
    #[must_use]
    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the default namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolves and executes a request.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] when the request cannot be resolved or
    /// the transport fails.
    pub fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse, StepError> {
        let resolved = request.resolve(&self.namespace).map_err(StepError::failed)?;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut event =
            HttpExchangeEvent::new(sequence, resolved.method.as_str(), resolved.target.clone());
        event.query.clone_from(&resolved.query);
        event.request_headers = redact_headers(&resolved.headers);
        event.request_bytes = resolved.body.len();
        let result = self.transport.execute(&resolved);
        match &result {
            Ok(response) => {
                event.status = Some(response.status());
                event.response_headers = response.headers().to_vec();
                event.response_bytes = response.body().len();
                event.response_preview = body_preview(response.body());
            }
            Err(err) => event.error = Some(err.to_string()),
        }
        self.sink.record(&event);
        result.map_err(StepError::failed)
    }
}
