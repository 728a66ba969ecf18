// crates/dist-conformance-transport/src/lib.rs
// ============================================================================
// Module: Distribution Conformance HTTP Transport
// Description: Blocking HTTP implementation of the probe transport.
// Purpose: Carry resolved probe requests to a live endpoint.
// Dependencies: dist-conformance-core, reqwest, url
// ============================================================================

//! ## Overview
//! [`HttpTransport`] turns a [`ResolvedRequest`] into one blocking HTTP
//! round trip. Path targets are appended to the configured root URL, so a
//! root with a path prefix keeps it. Server-issued locations are URI
//! references and resolve against the root URL the way a browser resolves a
//! link. Query parameters are appended after any the target already carries.
//! Every response records the URL it was served from so the next `Location`
//! can resolve against it. The transport never retries and never interprets
//! status codes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use dist_conformance_core::Method;
use dist_conformance_core::ProbeResponse;
use dist_conformance_core::ResolvedRequest;
use dist_conformance_core::TargetKind;
use dist_conformance_core::Transport;
use dist_conformance_core::TransportError;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("dist-conformance/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed before giving up; blob reads commonly redirect to
/// storage backends.
const MAX_REDIRECTS: usize = 10;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Endpoint root URL.
    pub root_url: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client.
    client: Client,
    /// Root URL with any trailing slash removed, for path targets.
    root: String,
    /// Root URL with a trailing slash, the base for relative locations.
    base: Url,
    /// Basic auth username and optional password.
    credentials: Option<(String, Option<String>)>,
}

impl HttpTransport {
    /// Builds a transport with a client configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the root URL is invalid or the client
    /// cannot be constructed.
    pub fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;
        Self::with_client(client, config)
    }

    /// Builds a transport around a preconfigured client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] when the root URL is not an
    /// absolute `http`/`https` URL.
    pub fn with_client(
        client: Client,
        config: &HttpTransportConfig,
    ) -> Result<Self, TransportError> {
        let root = config.root_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&format!("{root}/"))
            .map_err(|err| TransportError::InvalidUrl(format!("{}: {err}", config.root_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                config.root_url,
                parsed.scheme()
            )));
        }
        Ok(Self {
            client,
            root,
            base: parsed,
            credentials: config
                .username
                .clone()
                .map(|username| (username, config.password.clone())),
        })
    }

    /// Builds the full URL for a request target.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] when the result does not parse.
    pub fn url_for(&self, request: &ResolvedRequest) -> Result<Url, TransportError> {
        let mut url = match request.kind {
            TargetKind::Path => {
                let joined = format!("{}{}", self.root, request.target);
                Url::parse(&joined)
                    .map_err(|err| TransportError::InvalidUrl(format!("{joined}: {err}")))?
            }
            TargetKind::Location => self
                .base
                .join(&request.target)
                .map_err(|err| TransportError::InvalidUrl(format!("{}: {err}", request.target)))?,
        };
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

/// Maps a probe method onto the client method.
fn client_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Methods that always carry a body, so an empty one still sends
/// `Content-Length: 0`.
const fn sends_body(method: Method) -> bool {
    matches!(method, Method::Post | Method::Put | Method::Patch)
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ResolvedRequest) -> Result<ProbeResponse, TransportError> {
        let url = self.url_for(request)?;
        let mut builder = self.client.request(client_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((username, password)) = &self.credentials {
            builder = builder.basic_auth(username, password.as_ref());
        }
        if !request.body.is_empty() || sends_body(request.method) {
            builder = builder.body(request.body.clone());
        }
        let response = builder.send().map_err(|err| TransportError::Request(err.to_string()))?;
        let status = response.status().as_u16();
        let served_from = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        let body = response.bytes().map_err(|err| TransportError::Body(err.to_string()))?;
        Ok(ProbeResponse::new(status, headers, body.to_vec()).with_url(served_from))
    }
}
