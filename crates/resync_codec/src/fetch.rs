//! Document retrieval.

use std::fs;
use std::path::PathBuf;
use url::Url;

use crate::error::{CodecError, CodecResult};

/// Source of document bytes.
///
/// Implementations decide how a URI is retrieved. The client implements this
/// over its transport; [`LocalFetcher`] reads files.
pub trait Fetch {
    /// Returns the bytes of the document at `uri`.
    fn fetch(&self, uri: &str) -> CodecResult<Vec<u8>>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, uri: &str) -> CodecResult<Vec<u8>> {
        (**self).fetch(uri)
    }
}

/// Returns true if `uri` names a local file rather than a remote resource.
///
/// Local means a `file:` URL or anything without a `scheme://` prefix.
pub fn is_local(uri: &str) -> bool {
    uri.starts_with("file:") || !uri.contains("://")
}

/// Returns the filesystem path for a local `uri`.
pub fn local_path(uri: &str) -> Option<PathBuf> {
    if uri.starts_with("file:") {
        return Url::parse(uri).ok()?.to_file_path().ok();
    }
    if is_local(uri) {
        return Some(PathBuf::from(uri));
    }
    None
}

/// Reads documents from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

impl Fetch for LocalFetcher {
    fn fetch(&self, uri: &str) -> CodecResult<Vec<u8>> {
        let path = local_path(uri).ok_or_else(|| CodecError::fetch(uri, "not a local path"))?;
        fs::read(&path).map_err(|e| CodecError::fetch(uri, e))
    }
}
