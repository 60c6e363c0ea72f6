//! HTTP transport implementation.
//!
//! The HTTP client is abstracted behind [`HttpClient`] so that the blocking
//! reqwest client and an in-process loopback can be swapped. Local paths
//! and `file:` URIs never reach the client; they are read from disk.

use chrono::{DateTime, Utc};
use resync_codec::{is_local, local_path};
use std::fs;
use std::time::Duration;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::transport::{Response, Transport};

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Performs a GET and returns the response, or a description of the
    /// failure (including non-2xx statuses).
    fn get(&self, url: &str) -> Result<Response, String>;
}

/// Transport that reads local URIs from disk and sends the rest to `C`.
pub struct HttpTransport<C: HttpClient> {
    client: C,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport over `client`.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns the HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: HttpClient> Transport for HttpTransport<C> {
    fn get(&self, uri: &str) -> SyncResult<Response> {
        if is_local(uri) {
            return read_local(uri);
        }
        debug!(uri = %uri, "GET");
        self.client.get(uri).map_err(|e| SyncError::transfer(uri, e))
    }
}

fn read_local(uri: &str) -> SyncResult<Response> {
    let path = local_path(uri).ok_or_else(|| SyncError::transfer(uri, "not a local path"))?;
    let body = fs::read(&path).map_err(|e| SyncError::transfer(uri, e))?;
    let last_modified = fs::metadata(&path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);
    Ok(Response {
        content_length: Some(body.len() as u64),
        body,
        last_modified,
    })
}

/// Blocking reqwest client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("resync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Response, String> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| if e.is_timeout() { format!("timed out: {e}") } else { e.to_string() })?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }

        let content_length = response.content_length();
        let last_modified = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);
        let body = response.bytes().map_err(|e| e.to_string())?.to_vec();
        Ok(Response {
            body,
            content_length,
            last_modified,
        })
    }
}

/// Parses an HTTP `Last-Modified` value (`Tue, 15 Nov 1994 08:12:31 GMT`).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Servers that can answer loopback requests.
pub trait LoopbackServer {
    /// Handles a GET for `url`.
    fn handle_get(&self, url: &str) -> Result<Response, String>;
}

/// An HTTP client that routes requests directly to an in-process server.
///
/// Useful for testing without a network.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a client connected to `server`.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn get(&self, url: &str) -> Result<Response, String> {
        self.server.handle_get(url)
    }
}
