//! In-process document server.

use chrono::{DateTime, Utc};
use resync_codec::Sitemap;
use std::fs;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::builders::STATIC_PATH;
use crate::change_memory::CHANGELIST_PATH;
use crate::error::{SourceError, SourceResult};
use crate::source::{Source, RESOURCES_PATH};

/// Path of the dynamic resource list relative to the base URI.
pub const RESOURCELIST_PATH: &str = "/resourcelist.xml";

const XML: &str = "application/xml";
const OCTETS: &str = "application/octet-stream";
const TEXT: &str = "text/plain";

/// Answer to a GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResponse {
    /// HTTP status code.
    pub status: u16,
    /// Media type of the body.
    pub content_type: &'static str,
    /// Response body.
    pub body: Vec<u8>,
    /// Modification time of a resource payload.
    pub last_modified: Option<DateTime<Utc>>,
}

impl SourceResponse {
    fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into(),
            last_modified: None,
        }
    }

    fn error(err: &SourceError) -> Self {
        Self {
            status: err.status(),
            content_type: TEXT,
            body: err.to_string().into_bytes(),
            last_modified: None,
        }
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Serves the documents and payloads of a [`Source`].
///
/// Routes, relative to the source's base URI:
/// - `/resourcelist.xml`: the current inventory
/// - `/changelist.xml[?from=N]`: a window of the change memory
/// - `/resources/<name>`: a resource payload
/// - `/static/<file>`: a file from the static directory
///
/// # Example
///
/// ```
/// use resync_source::{Source, SourceConfig, SourceServer};
/// use std::sync::Arc;
///
/// let source = Arc::new(Source::new(SourceConfig::new("http://example.org/rs")).unwrap());
/// source.create(4);
///
/// let server = SourceServer::new(source);
/// let response = server.handle_get("http://example.org/rs/resources/1");
/// assert_eq!(response.body.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct SourceServer {
    source: Arc<Source>,
    sitemap: Sitemap,
}

impl SourceServer {
    /// Creates a server for `source`.
    pub fn new(source: Arc<Source>) -> Self {
        Self {
            source,
            sitemap: Sitemap::new(),
        }
    }

    /// Returns the served source.
    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    /// Handles a GET for a full URI or a path below the base URI.
    ///
    /// Failures become error responses.
    pub fn handle_get(&self, target: &str) -> SourceResponse {
        match self.handle(target) {
            Ok(response) => response,
            Err(e) => {
                if e.is_client_error() {
                    debug!(target = %target, error = %e, "request rejected");
                } else {
                    warn!(target = %target, error = %e, "request failed");
                }
                SourceResponse::error(&e)
            }
        }
    }

    /// Handles a GET, returning failures as errors.
    pub fn handle(&self, target: &str) -> SourceResult<SourceResponse> {
        let relative = target
            .strip_prefix(self.source.base_uri())
            .unwrap_or(target);
        let (path, query) = match relative.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (relative, None),
        };
        let not_found = || SourceError::NotFound {
            path: path.to_string(),
        };

        if path == RESOURCELIST_PATH && self.source.serves_resource_list() {
            let xml = self.sitemap.resources_as_xml(&self.source.resource_list())?;
            return Ok(SourceResponse::ok(XML, xml));
        }

        if path == CHANGELIST_PATH {
            let memory = self.source.change_memory().ok_or_else(not_found)?;
            let from = parse_from(query)?;
            let xml = self.sitemap.changes_as_xml(&memory.generate(from)?)?;
            return Ok(SourceResponse::ok(XML, xml));
        }

        if let Some(name) = path
            .strip_prefix(RESOURCES_PATH)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            let resource = self.source.resource(name).ok_or_else(not_found)?;
            let body = self.source.payload(name).ok_or_else(not_found)?;
            return Ok(SourceResponse {
                last_modified: resource.last_modified,
                ..SourceResponse::ok(OCTETS, body)
            });
        }

        if let Some(file) = path
            .strip_prefix(STATIC_PATH)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            if file.is_empty() || file.contains('/') || file.contains("..") {
                return Err(not_found());
            }
            let dir = self.source.config().static_dir.as_ref().ok_or_else(not_found)?;
            let body = fs::read(dir.join(file)).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => not_found(),
                _ => SourceError::Io(e),
            })?;
            return Ok(SourceResponse::ok(XML, body));
        }

        Err(not_found())
    }
}

fn parse_from(query: Option<&str>) -> SourceResult<Option<u64>> {
    let Some(query) = query else {
        return Ok(None);
    };
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("from=") {
            return value
                .parse()
                .map(Some)
                .map_err(|_| SourceError::NotFound {
                    path: format!("{CHANGELIST_PATH}?{query}"),
                });
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CapabilityBuilder, SourceConfig};
    use resync_codec::parse_document;
    use tempfile::TempDir;

    const BASE: &str = "http://example.org/rs";

    fn server(max_changes: Option<usize>) -> SourceServer {
        let config = SourceConfig::new(BASE)
            .with_resource_count(3)
            .with_average_payload(10)
            .with_builders(vec![
                CapabilityBuilder::DynamicResourceList,
                CapabilityBuilder::DynamicChangeList { max_changes },
            ]);
        let source = Source::new(config).unwrap();
        source.bootstrap();
        SourceServer::new(Arc::new(source))
    }

    #[test]
    fn serves_resource_list() {
        let server = server(None);
        let response = server.handle_get(&format!("{BASE}/resourcelist.xml"));
        assert_eq!(response.status, 200);

        let doc = parse_document("resourcelist.xml", &response.body).unwrap();
        assert_eq!(doc.entries.len(), 3);
        assert_eq!(
            doc.capabilities.hrefs_with_rel("current"),
            vec!["http://example.org/rs/changelist.xml"]
        );
    }

    #[test]
    fn serves_change_windows() {
        let server = server(Some(2));
        let source = server.source().clone();
        source.create(5);
        source.update("1", 4).unwrap();
        source.delete("2").unwrap();

        let response = server.handle_get("/changelist.xml");
        assert_eq!(response.status, 200);
        let list = parse_document("c", &response.body)
            .unwrap()
            .into_change_list()
            .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.changes()[0].change_id, 2);

        let caught_up = server.handle_get("/changelist.xml?from=4");
        assert_eq!(caught_up.status, 200);

        let evicted = server.handle_get("/changelist.xml?from=1");
        assert_eq!(evicted.status, 404);
        assert!(String::from_utf8_lossy(&evicted.body).contains("unknown change id 1"));

        assert_eq!(server.handle_get("/changelist.xml?from=9").status, 404);
        assert_eq!(server.handle_get("/changelist.xml?from=x").status, 404);
    }

    #[test]
    fn serves_payloads() {
        let server = server(None);
        let response = server.handle_get(&format!("{BASE}/resources/2"));
        assert!(response.is_success());
        assert_eq!(response.content_type, "application/octet-stream");
        assert!(response.last_modified.is_some());
        assert_eq!(
            response.body,
            server.source().payload("2").unwrap()
        );

        assert_eq!(server.handle_get("/resources/99").status, 404);
        assert_eq!(server.handle_get("/nothing").status, 404);
    }

    #[test]
    fn serves_static_files() {
        let dir = TempDir::new().unwrap();
        let config = SourceConfig::new(BASE)
            .with_resource_count(2)
            .with_static_dir(dir.path())
            .with_builders(vec![CapabilityBuilder::StaticResourceList {
                max_sitemap_entries: 100,
            }]);
        let source = Arc::new(Source::new(config).unwrap());
        source.bootstrap();
        source.write_static_resource_list().unwrap().unwrap();

        let server = SourceServer::new(source);
        let response = server.handle_get(&format!("{BASE}/static/resourcelist.xml"));
        assert_eq!(response.status, 200);
        assert!(String::from_utf8_lossy(&response.body).contains("<urlset"));

        assert_eq!(server.handle_get("/static/missing.xml").status, 404);
        assert_eq!(server.handle_get("/static/../secret").status, 404);
        // Not served without the dynamic builder
        assert_eq!(server.handle_get("/resourcelist.xml").status, 404);
    }
}
