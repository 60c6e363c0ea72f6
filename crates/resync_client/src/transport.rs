//! Transport layer abstraction for resource and document retrieval.

use chrono::{DateTime, Utc};
use resync_codec::{CodecError, CodecResult, Fetch};
use resync_protocol::Resource;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::{SyncError, SyncResult};

/// Body and metadata returned by a GET.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Response body.
    pub body: Vec<u8>,
    /// Declared length, if the server sent one.
    pub content_length: Option<u64>,
    /// Declared modification time, if the server sent one.
    pub last_modified: Option<DateTime<Utc>>,
}

impl Response {
    /// Creates a response with only a body.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            content_length: Some(body.len() as u64),
            body,
            last_modified: None,
        }
    }

    /// Sets the modification time.
    pub fn with_last_modified(mut self, ts: DateTime<Utc>) -> Self {
        self.last_modified = Some(ts);
        self
    }
}

/// Retrieves documents and resources.
///
/// Failures are reported as [`SyncError::ResourceTransfer`]; the caller
/// reclassifies them when the target was a document.
pub trait Transport: Send + Sync {
    /// Performs a GET for `uri`.
    fn get(&self, uri: &str) -> SyncResult<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, uri: &str) -> SyncResult<Response> {
        (**self).get(uri)
    }
}

/// Adapts a [`Transport`] to the codec's [`Fetch`] interface.
pub struct TransportFetcher<'a, T: Transport + ?Sized>(pub &'a T);

impl<T: Transport + ?Sized> Fetch for TransportFetcher<'_, T> {
    fn fetch(&self, uri: &str) -> CodecResult<Vec<u8>> {
        match self.0.get(uri) {
            Ok(response) => Ok(response.body),
            Err(SyncError::ResourceTransfer { message, .. }) => Err(CodecError::fetch(uri, message)),
            Err(e) => Err(CodecError::fetch(uri, e)),
        }
    }
}

#[derive(Debug, Clone)]
enum MockEntry {
    Found(Response),
    Failing(String),
}

/// An in-memory transport for tests.
///
/// Unknown URIs fail with a 404-style transfer error. Every request is
/// recorded in order.
#[derive(Debug, Default)]
pub struct MockTransport {
    entries: Mutex<HashMap<String, MockEntry>>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Creates an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` at `uri`.
    pub fn insert(&self, uri: impl Into<String>, response: Response) {
        self.entries
            .lock()
            .insert(uri.into(), MockEntry::Found(response));
    }

    /// Serves `body` for `resource`, carrying its timestamp.
    pub fn insert_resource(&self, resource: &Resource, body: impl Into<Vec<u8>>) {
        let mut response = Response::new(body);
        response.last_modified = resource.last_modified;
        self.insert(resource.uri.clone(), response);
    }

    /// Makes every request for `uri` fail with `message`.
    pub fn fail(&self, uri: impl Into<String>, message: impl Into<String>) {
        self.entries
            .lock()
            .insert(uri.into(), MockEntry::Failing(message.into()));
    }

    /// Stops serving `uri`.
    pub fn remove(&self, uri: &str) {
        self.entries
            .lock()
            .remove(uri);
    }

    /// Returns the URIs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .clone()
    }

    /// Returns how many times `uri` was requested.
    pub fn request_count(&self, uri: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|u| *u == uri)
            .count()
    }
}

impl Transport for MockTransport {
    fn get(&self, uri: &str) -> SyncResult<Response> {
        self.requests
            .lock()
            .push(uri.to_string());
        let entry = self
            .entries
            .lock()
            .get(uri)
            .cloned();
        match entry {
            Some(MockEntry::Found(response)) => Ok(response),
            Some(MockEntry::Failing(message)) => Err(SyncError::transfer(uri, message)),
            None => Err(SyncError::transfer(uri, "404 Not Found")),
        }
    }
}
