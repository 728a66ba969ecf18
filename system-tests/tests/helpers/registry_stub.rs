// system-tests/tests/helpers/registry_stub.rs
// ============================================================================
// Module: Registry Stub
// Description: In-process distribution registry for system-tests.
// Purpose: Serve blobs, uploads, manifests and tag listings over real HTTP.
// Dependencies: dist-conformance-core, serde_json, tiny_http, url
// ============================================================================

//! ## Overview
//! A single-threaded `tiny_http` server backed by in-memory repositories.
//! It implements the subset of the distribution protocol the conformance
//! suite exercises, answers failures with error envelopes, and can be told
//! to misbehave through [`RegistryQuirks`].

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::io::Cursor;
use std::io::Read;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use dist_conformance_core::Digest;
use dist_conformance_core::ErrorCode;
use dist_conformance_core::ErrorEnvelope;
use dist_conformance_core::fixtures::ImageManifest;
use dist_conformance_core::fixtures::MANIFEST_MEDIA_TYPE;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Method;
use tiny_http::Request;
use tiny_http::Response;
use tiny_http::Server;
use url::Url;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Deliberate protocol violations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryQuirks {
    /// Resume tag listings at the `last` cursor instead of after it.
    pub inclusive_cursor: bool,
    /// Accept any manifest body, including non-JSON.
    pub accept_any_manifest: bool,
    /// Issue upload locations as path-relative references (`<session>?_state=<n>`).
    pub relative_upload_locations: bool,
}

/// One request observed by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request path without the query.
    pub path: String,
    /// `Authorization` header, if any.
    pub authorization: Option<String>,
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Content of one repository.
#[derive(Debug, Default)]
struct Repository {
    /// Blobs keyed by digest string.
    blobs: HashMap<String, Vec<u8>>,
    /// Manifests keyed by digest string.
    manifests: HashMap<String, Vec<u8>>,
    /// Tag to manifest digest, listed in lexical order.
    tags: BTreeMap<String, String>,
}

/// Mutable registry state shared with the server thread.
#[derive(Debug, Default)]
struct RegistryState {
    /// Repositories keyed by name.
    repositories: HashMap<String, Repository>,
    /// Open upload sessions keyed by id, holding received bytes.
    uploads: HashMap<String, (String, Vec<u8>)>,
    /// Next upload session id.
    next_upload: u64,
    /// Requests in arrival order.
    requests: Vec<RecordedRequest>,
}

/// Stub response before conversion to `tiny_http`.
struct Reply {
    /// Status code.
    status: u16,
    /// Response headers.
    headers: Vec<(String, String)>,
    /// Response body.
    body: Vec<u8>,
}

impl Reply {
    /// Builds an empty reply.
    const fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Builds an error envelope reply.
    fn error(status: u16, code: ErrorCode, message: &str) -> Self {
        let body = serde_json::to_vec(&ErrorEnvelope::single(code, message)).unwrap_or_default();
        Self::empty(status).header("Content-Type", "application/json").body(body)
    }

    /// Adds a header.
    fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Sets the body.
    fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Converts into a `tiny_http` response.
    fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let mut response = Response::from_data(self.body).with_status_code(self.status);
        for (name, value) in &self.headers {
            if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                response = response.with_header(header);
            }
        }
        response
    }
}

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Handle for a running registry stub; shuts the server down on drop.
pub struct RegistryStub {
    /// Root URL of the stub.
    base_url: String,
    /// Server shared with the worker thread.
    server: Arc<Server>,
    /// Worker thread.
    join: Option<thread::JoinHandle<()>>,
    /// Shared state.
    state: Arc<Mutex<RegistryState>>,
}

impl RegistryStub {
    /// Starts a well-behaved stub.
    pub fn spawn() -> Result<Self, String> {
        Self::spawn_with(RegistryQuirks::default())
    }

    /// Starts a stub with the given quirks.
    pub fn spawn_with(quirks: RegistryQuirks) -> Result<Self, String> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|err| format!("registry stub bind failed: {err}"))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| "registry stub is not bound to an ip address".to_string())?;
        let server = Arc::new(server);
        let state = Arc::new(Mutex::new(RegistryState::default()));
        let join = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    handle(request, &state, quirks);
                }
            })
        };
        Ok(Self {
            base_url: format!("http://{addr}"),
            server,
            join: Some(join),
            state,
        })
    }

    /// Returns the registry root URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns captured requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().map_or_else(|_| Vec::new(), |state| state.requests.clone())
    }

    /// Returns the tags of `name` in listing order.
    pub fn tags(&self, name: &str) -> Vec<String> {
        self.state.lock().map_or_else(
            |_| Vec::new(),
            |state| {
                state
                    .repositories
                    .get(name)
                    .map(|repo| repo.tags.keys().cloned().collect())
                    .unwrap_or_default()
            },
        )
    }

    /// Returns true when `name` holds a blob with `digest`.
    pub fn has_blob(&self, name: &str, digest: &str) -> bool {
        self.state.lock().is_ok_and(|state| {
            state.repositories.get(name).is_some_and(|repo| repo.blobs.contains_key(digest))
        })
    }

    /// Seeds `name` with a manifest under `tag`, bypassing HTTP.
    pub fn seed_manifest(&self, name: &str, tag: &str, manifest: &[u8]) {
        if let Ok(mut state) = self.state.lock() {
            let digest = Digest::from_bytes(manifest).to_string();
            let repo = state.repositories.entry(name.to_string()).or_default();
            repo.manifests.insert(digest.clone(), manifest.to_vec());
            repo.tags.insert(tag.to_string(), digest);
        }
    }

    /// Seeds `name` with a blob, bypassing HTTP.
    pub fn seed_blob(&self, name: &str, blob: &[u8]) {
        if let Ok(mut state) = self.state.lock() {
            let digest = Digest::from_bytes(blob).to_string();
            let repository = state.repositories.entry(name.to_string()).or_default();
            repository.blobs.insert(digest, blob.to_vec());
        }
    }
}

impl Drop for RegistryStub {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

// ============================================================================
// SECTION: Routing
// ============================================================================

/// Route resolved from a request path.
enum Route<'a> {
    /// `/v2/<name>/blobs/uploads/` or `/v2/<name>/blobs/uploads/<id>`.
    Upload {
        /// Repository name.
        name: &'a str,
        /// Session id; empty when opening a session.
        session: &'a str,
    },
    /// `/v2/<name>/blobs/<digest>`.
    Blob {
        /// Repository name.
        name: &'a str,
        /// Blob digest.
        digest: &'a str,
    },
    /// `/v2/<name>/manifests/<reference>`.
    Manifest {
        /// Repository name.
        name: &'a str,
        /// Tag or digest.
        reference: &'a str,
    },
    /// `/v2/<name>/tags/list`.
    Tags {
        /// Repository name.
        name: &'a str,
    },
}

/// Resolves a request path. Names may contain slashes.
fn route(path: &str) -> Option<Route<'_>> {
    let rest = path.strip_prefix("/v2/")?;
    if let Some((name, session)) = rest.split_once("/blobs/uploads/") {
        return Some(Route::Upload {
            name,
            session,
        });
    }
    if let Some(name) = rest.strip_suffix("/tags/list") {
        return Some(Route::Tags {
            name,
        });
    }
    if let Some((name, reference)) = rest.rsplit_once("/manifests/") {
        return Some(Route::Manifest {
            name,
            reference,
        });
    }
    rest.rsplit_once("/blobs/").map(|(name, digest)| Route::Blob {
        name,
        digest,
    })
}

/// Handles one request end to end.
fn handle(mut request: Request, state: &Mutex<RegistryState>, quirks: RegistryQuirks) {
    let mut body = Vec::new();
    let _ = request.as_reader().read_to_end(&mut body);
    let reply = match Url::parse(&format!("http://stub{}", request.url())) {
        Ok(url) => {
            let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
            let header = |name: &str| {
                request
                    .headers()
                    .iter()
                    .find(|header| header.field.as_str().as_str().eq_ignore_ascii_case(name))
                    .map(|header| header.value.as_str().to_string())
            };
            let content_range = header("Content-Range");
            let authorization = header("Authorization");
            match state.lock() {
                Ok(mut state) => {
                    state.requests.push(RecordedRequest {
                        method: request.method().to_string(),
                        path: url.path().to_string(),
                        authorization,
                    });
                    dispatch(&mut state, &Exchange {
                        method: request.method(),
                        path: url.path(),
                        query: &query,
                        content_range: content_range.as_deref(),
                        body,
                        quirks,
                    })
                }
                Err(_) => Reply::empty(500),
            }
        }
        Err(_) => Reply::empty(400),
    };
    let _ = request.respond(reply.into_response());
}

/// Parsed request handed to the handlers.
struct Exchange<'a> {
    /// HTTP method.
    method: &'a Method,
    /// Request path without the query.
    path: &'a str,
    /// Query parameters.
    query: &'a HashMap<String, String>,
    /// `Content-Range` header.
    content_range: Option<&'a str>,
    /// Request body.
    body: Vec<u8>,
    /// Active quirks.
    quirks: RegistryQuirks,
}

/// Dispatches to the handler for the route and method.
fn dispatch(state: &mut RegistryState, exchange: &Exchange<'_>) -> Reply {
    match (route(exchange.path), exchange.method) {
        (Some(Route::Upload { name, session: "" }), Method::Post) => {
            open_upload(state, name, exchange.quirks)
        }
        (Some(Route::Upload { name, session }), Method::Patch) => {
            patch_upload(state, name, session, exchange)
        }
        (Some(Route::Upload { name, session }), Method::Put) => {
            close_upload(state, name, session, exchange)
        }
        (Some(Route::Blob { name, digest }), Method::Get | Method::Head) => {
            get_blob(state, name, digest)
        }
        (Some(Route::Blob { name, digest }), Method::Delete) => delete_blob(state, name, digest),
        (Some(Route::Manifest { name, reference }), Method::Put) => {
            put_manifest(state, name, reference, exchange)
        }
        (Some(Route::Manifest { name, reference }), Method::Get | Method::Head) => {
            get_manifest(state, name, reference)
        }
        (Some(Route::Manifest { name, reference }), Method::Delete) => {
            delete_manifest(state, name, reference)
        }
        (Some(Route::Tags { name }), Method::Get) => list_tags(state, name, exchange),
        (Some(_), _) => Reply::error(405, ErrorCode::Unsupported, "method not allowed"),
        (None, _) => Reply::empty(404),
    }
}

// ============================================================================
// SECTION: Blob Uploads
// ============================================================================

/// Location of an upload session.
///
/// The relative form resolves to the same path from both the session
/// creation URL and the session URL itself.
fn upload_location(name: &str, session: &str, quirks: RegistryQuirks, received: usize) -> String {
    if quirks.relative_upload_locations {
        format!("{session}?_state={received}")
    } else {
        format!("/v2/{name}/blobs/uploads/{session}")
    }
}

/// Opens an upload session.
fn open_upload(state: &mut RegistryState, name: &str, quirks: RegistryQuirks) -> Reply {
    state.next_upload += 1;
    let session = state.next_upload.to_string();
    state.uploads.insert(session.clone(), (name.to_string(), Vec::new()));
    Reply::empty(202)
        .header("Location", upload_location(name, &session, quirks, 0))
        .header("Docker-Upload-UUID", session)
        .header("Range", "0-0")
}

/// Appends a chunk; the range must start where the session ends.
fn patch_upload(
    state: &mut RegistryState,
    name: &str,
    session: &str,
    exchange: &Exchange<'_>,
) -> Reply {
    let Some((owner, received)) = state.uploads.get_mut(session) else {
        return Reply::error(404, ErrorCode::BlobUploadUnknown, "upload session not found");
    };
    if owner != name {
        return Reply::error(404, ErrorCode::BlobUploadUnknown, "upload session not found");
    }
    if let Some(range) = exchange.content_range {
        let start = range.split_once('-').and_then(|(start, _)| start.parse::<usize>().ok());
        if start != Some(received.len()) {
            return Reply::error(416, ErrorCode::BlobUploadInvalid, "content range out of order");
        }
    }
    received.extend_from_slice(&exchange.body);
    let end = received.len().saturating_sub(1);
    Reply::empty(202)
        .header("Location", upload_location(name, session, exchange.quirks, received.len()))
        .header("Range", format!("0-{end}"))
}

/// Completes a session; the final body is appended before verification.
fn close_upload(
    state: &mut RegistryState,
    name: &str,
    session: &str,
    exchange: &Exchange<'_>,
) -> Reply {
    let Some(expected) = exchange.query.get("digest") else {
        return Reply::error(400, ErrorCode::DigestInvalid, "digest query parameter required");
    };
    let Ok(expected) = Digest::parse(expected) else {
        return Reply::error(400, ErrorCode::DigestInvalid, "malformed digest");
    };
    let Some((owner, mut received)) = state.uploads.remove(session) else {
        return Reply::error(404, ErrorCode::BlobUploadUnknown, "upload session not found");
    };
    if owner != name {
        return Reply::error(404, ErrorCode::BlobUploadUnknown, "upload session not found");
    }
    received.extend_from_slice(&exchange.body);
    if !expected.verifies(&received) {
        return Reply::error(400, ErrorCode::DigestInvalid, "content does not match digest");
    }
    let digest = expected.to_string();
    state.repositories.entry(name.to_string()).or_default().blobs.insert(digest.clone(), received);
    Reply::empty(201)
        .header("Location", format!("/v2/{name}/blobs/{digest}"))
        .header("Docker-Content-Digest", digest)
}

// ============================================================================
// SECTION: Blobs
// ============================================================================

/// Serves a blob; HEAD shares the GET reply and drops the body on the wire.
fn get_blob(state: &RegistryState, name: &str, digest: &str) -> Reply {
    let Some(repo) = state.repositories.get(name) else {
        return Reply::error(404, ErrorCode::NameUnknown, "repository not found");
    };
    repo.blobs.get(digest).map_or_else(
        || Reply::error(404, ErrorCode::BlobUnknown, "blob not found"),
        |blob| {
            Reply::empty(200)
                .header("Content-Type", "application/octet-stream")
                .header("Docker-Content-Digest", digest)
                .body(blob.clone())
        },
    )
}

/// Deletes a blob.
fn delete_blob(state: &mut RegistryState, name: &str, digest: &str) -> Reply {
    let Some(repo) = state.repositories.get_mut(name) else {
        return Reply::error(404, ErrorCode::NameUnknown, "repository not found");
    };
    if repo.blobs.remove(digest).is_none() {
        return Reply::error(404, ErrorCode::BlobUnknown, "blob not found");
    }
    Reply::empty(202)
}

// ============================================================================
// SECTION: Manifests
// ============================================================================

/// Stores a manifest under a tag or its own digest.
fn put_manifest(
    state: &mut RegistryState,
    name: &str,
    reference: &str,
    exchange: &Exchange<'_>,
) -> Reply {
    let repo = state.repositories.entry(name.to_string()).or_default();
    if !exchange.quirks.accept_any_manifest {
        let Ok(manifest) = serde_json::from_slice::<ImageManifest>(&exchange.body) else {
            return Reply::error(400, ErrorCode::ManifestInvalid, "manifest is not valid json");
        };
        if !repo.blobs.contains_key(&manifest.config.digest) {
            return Reply::error(
                400,
                ErrorCode::ManifestBlobUnknown,
                "manifest references an unknown config blob",
            );
        }
    }
    let digest = Digest::from_bytes(&exchange.body).to_string();
    if reference.contains(':') && reference != digest {
        return Reply::error(400, ErrorCode::DigestInvalid, "reference does not match content");
    }
    repo.manifests.insert(digest.clone(), exchange.body.clone());
    if !reference.contains(':') {
        repo.tags.insert(reference.to_string(), digest.clone());
    }
    Reply::empty(201)
        .header("Location", format!("/v2/{name}/manifests/{digest}"))
        .header("Docker-Content-Digest", digest)
}

/// Serves a manifest by tag or digest.
fn get_manifest(state: &RegistryState, name: &str, reference: &str) -> Reply {
    let Some(repo) = state.repositories.get(name) else {
        return Reply::error(404, ErrorCode::NameUnknown, "repository not found");
    };
    let digest = repo.tags.get(reference).map_or(reference, String::as_str);
    repo.manifests.get(digest).map_or_else(
        || Reply::error(404, ErrorCode::ManifestUnknown, "manifest not found"),
        |manifest| {
            Reply::empty(200)
                .header("Content-Type", MANIFEST_MEDIA_TYPE)
                .header("Docker-Content-Digest", digest)
                .body(manifest.clone())
        },
    )
}

/// Deletes a tag, or a manifest and every tag pointing at it.
fn delete_manifest(state: &mut RegistryState, name: &str, reference: &str) -> Reply {
    let Some(repo) = state.repositories.get_mut(name) else {
        return Reply::error(404, ErrorCode::NameUnknown, "repository not found");
    };
    if !reference.contains(':') {
        return match repo.tags.remove(reference) {
            Some(_) => Reply::empty(202),
            None => Reply::error(404, ErrorCode::ManifestUnknown, "tag not found"),
        };
    }
    if repo.manifests.remove(reference).is_none() {
        return Reply::error(404, ErrorCode::ManifestUnknown, "manifest not found");
    }
    repo.tags.retain(|_, digest| digest != reference);
    Reply::empty(202)
}

// ============================================================================
// SECTION: Tags
// ============================================================================

/// Lists tags honouring `n` and `last`.
fn list_tags(state: &RegistryState, name: &str, exchange: &Exchange<'_>) -> Reply {
    let Some(repo) = state.repositories.get(name) else {
        return Reply::error(404, ErrorCode::NameUnknown, "repository not found");
    };
    let tags: Vec<&String> = repo.tags.keys().collect();
    let start = exchange.query.get("last").map_or(0, |last| {
        let before = tags.iter().take_while(|tag| tag.as_str() < last.as_str()).count();
        let at_cursor = tags.get(before).is_some_and(|tag| *tag == last);
        if at_cursor && !exchange.quirks.inclusive_cursor { before + 1 } else { before }
    });
    let remaining = &tags[start.min(tags.len())..];
    let limit = match exchange.query.get("n").map(|n| n.parse::<usize>()) {
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            return Reply::error(400, ErrorCode::Unsupported, "n must be a non-negative integer");
        }
        None => remaining.len(),
    };
    let page: Vec<&String> = remaining.iter().take(limit).copied().collect();
    let body = json!({"name": name, "tags": page});
    Reply::empty(200).header("Content-Type", "application/json").body(body.to_string().into_bytes())
}
