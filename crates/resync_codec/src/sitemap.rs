//! Reading and writing inventories and change lists, with pagination.

use chrono::{DateTime, Utc};
use resync_protocol::{Capabilities, ChangeList, DupePolicy, Mapper, Resource, ResourceSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use crate::document::{Document, DocumentKind};
use crate::error::{CodecError, CodecResult};
use crate::fetch::{is_local, Fetch};
use crate::reader::parse_document;
use crate::writer::{index_to_xml, urlset_to_xml, WriteEntry};

/// Default number of entries per document.
pub const DEFAULT_MAX_ENTRIES: usize = 50_000;

/// Files produced by a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    /// Index document, if the output was paginated.
    pub index: Option<PathBuf>,
    /// Documents holding entries, in order.
    pub documents: Vec<PathBuf>,
}

impl Written {
    /// Returns true if an index was written.
    pub fn is_multifile(&self) -> bool {
        self.index.is_some()
    }
}

/// Sitemap reader and writer.
///
/// Documents with more than `max_entries` entries are split into
/// `<stem>NNNNN<ext>` files next to the target and referenced from a
/// `<sitemapindex>` written at the target path.
#[derive(Debug, Clone)]
pub struct Sitemap {
    max_entries: usize,
    allow_multifile: bool,
    dupe_policy: DupePolicy,
    pretty: bool,
    mapper: Mapper,
}

impl Default for Sitemap {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            allow_multifile: true,
            dupe_policy: DupePolicy::Replace,
            pretty: false,
            mapper: Mapper::default(),
        }
    }
}

impl Sitemap {
    /// Creates a codec with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of entries per document (at least 1).
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    /// Enables or disables paginated output and reading through an index.
    pub fn with_multifile(mut self, allow: bool) -> Self {
        self.allow_multifile = allow;
        self
    }

    /// Sets how repeated URIs within a document are resolved.
    pub fn with_dupe_policy(mut self, policy: DupePolicy) -> Self {
        self.dupe_policy = policy;
        self
    }

    /// Enables indented output.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the mapper used to name and resolve child documents.
    pub fn with_mapper(mut self, mapper: Mapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Returns the entries-per-document limit.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Serializes a resource set as a single document.
    pub fn resources_as_xml(&self, set: &ResourceSet) -> CodecResult<String> {
        urlset_to_xml(set.iter().map(WriteEntry::Resource), set.capabilities(), self.pretty)
    }

    /// Serializes a change list as a single document.
    pub fn changes_as_xml(&self, list: &ChangeList) -> CodecResult<String> {
        urlset_to_xml(list.iter().map(WriteEntry::Change), list.capabilities(), self.pretty)
    }

    /// Writes a resource set to `path`, paginating when needed.
    pub fn write(&self, set: &ResourceSet, path: &Path) -> CodecResult<Written> {
        let entries: Vec<_> = set.iter().map(WriteEntry::Resource).collect();
        self.write_entries(&entries, set.capabilities(), path)
    }

    /// Writes a change list to `path`, paginating when needed.
    pub fn write_change_list(&self, list: &ChangeList, path: &Path) -> CodecResult<Written> {
        let entries: Vec<_> = list.iter().map(WriteEntry::Change).collect();
        self.write_entries(&entries, list.capabilities(), path)
    }

    fn write_entries(
        &self,
        entries: &[WriteEntry<'_>],
        capabilities: &Capabilities,
        path: &Path,
    ) -> CodecResult<Written> {
        if entries.len() <= self.max_entries {
            let xml = urlset_to_xml(entries.iter().copied(), capabilities, self.pretty)?;
            write_file(path, &xml)?;
            info!(path = %path.display(), entries = entries.len(), "wrote sitemap");
            return Ok(Written {
                index: None,
                documents: vec![path.to_path_buf()],
            });
        }

        if !self.allow_multifile {
            return Err(CodecError::MultifileDisabled {
                count: entries.len(),
                max: self.max_entries,
            });
        }

        let mut children = Vec::new();
        let mut documents = Vec::new();
        for (n, chunk) in entries.chunks(self.max_entries).enumerate() {
            let chunk_path = chunk_path(path, n);
            let xml = urlset_to_xml(chunk.iter().copied(), &Capabilities::new(), self.pretty)?;
            write_file(&chunk_path, &xml)?;

            let mtime = fs::metadata(&chunk_path)
                .and_then(|m| m.modified())
                .map_err(|e| CodecError::io(&chunk_path, &e))?;
            children.push(
                Resource::new(self.document_uri(&chunk_path))
                    .with_last_modified(DateTime::<Utc>::from(mtime)),
            );
            debug!(path = %chunk_path.display(), entries = chunk.len(), "wrote sitemap chunk");
            documents.push(chunk_path);
        }

        let xml = index_to_xml(&children, capabilities, self.pretty)?;
        write_file(path, &xml)?;
        info!(
            path = %path.display(),
            documents = documents.len(),
            entries = entries.len(),
            "wrote sitemapindex"
        );

        Ok(Written {
            index: Some(path.to_path_buf()),
            documents,
        })
    }

    /// Returns the URI under which a written document is published.
    fn document_uri(&self, path: &Path) -> String {
        if let Ok(uri) = self.mapper.dst_to_src(path) {
            return uri;
        }
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Url::from_file_path(&absolute)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("file://{}", absolute.display()))
    }

    /// Fetches and parses one document without following an index.
    pub fn read_root<F: Fetch + ?Sized>(&self, fetcher: &F, uri: &str) -> CodecResult<Document> {
        let bytes = fetcher.fetch(uri)?;
        let doc = parse_document(uri, &bytes)?;
        debug!(uri = %uri, entries = doc.entries.len(), index = doc.is_index(), "read document");
        Ok(doc)
    }

    /// Reads a single `<urlset>` document, rejecting an index.
    pub fn read_single<F: Fetch + ?Sized>(&self, fetcher: &F, uri: &str) -> CodecResult<ResourceSet> {
        let doc = self.read_root(fetcher, uri)?;
        if doc.is_index() {
            return Err(CodecError::UnexpectedIndex { uri: uri.to_string() });
        }
        doc.into_resource_set(self.dupe_policy)
    }

    /// Reads a `<sitemapindex>` document without following it.
    pub fn read_index<F: Fetch + ?Sized>(&self, fetcher: &F, uri: &str) -> CodecResult<Document> {
        let doc = self.read_root(fetcher, uri)?;
        if !doc.is_index() {
            return Err(CodecError::UnexpectedUrlSet { uri: uri.to_string() });
        }
        Ok(doc)
    }

    fn check_index_allowed(&self, uri: &str) -> CodecResult<()> {
        if self.allow_multifile {
            Ok(())
        } else {
            Err(CodecError::IndexDisabled { uri: uri.to_string() })
        }
    }

    /// Reads an inventory, following an index into every child document.
    ///
    /// An index is rejected with [`CodecError::IndexDisabled`] when
    /// multi-file support is off.
    pub fn read<F: Fetch + ?Sized>(&self, fetcher: &F, uri: &str) -> CodecResult<ResourceSet> {
        let root = self.read_root(fetcher, uri)?;
        if root.kind == DocumentKind::UrlSet {
            return root.into_resource_set(self.dupe_policy);
        }
        self.check_index_allowed(uri)?;

        let mut set = ResourceSet::new();
        *set.capabilities_mut() = root.capabilities;
        for child in root.entries {
            let child_uri = self.resolve_child(uri, &child.resource.uri);
            let doc = self.read_root(fetcher, &child_uri)?;
            if doc.is_index() {
                return Err(CodecError::UnexpectedIndex { uri: child_uri });
            }
            doc.merge_into(&mut set, self.dupe_policy)?;
        }
        info!(uri = %uri, resources = set.len(), "read paginated inventory");
        Ok(set)
    }

    /// Reads a change list, concatenating index children in order.
    pub fn read_change_list<F: Fetch + ?Sized>(&self, fetcher: &F, uri: &str) -> CodecResult<ChangeList> {
        let root = self.read_root(fetcher, uri)?;
        if root.kind == DocumentKind::UrlSet {
            return root.into_change_list();
        }
        self.check_index_allowed(uri)?;

        let mut list = ChangeList::new();
        *list.capabilities_mut() = root.capabilities;
        for child in root.entries {
            let child_uri = self.resolve_child(uri, &child.resource.uri);
            let doc = self.read_root(fetcher, &child_uri)?;
            if doc.is_index() {
                return Err(CodecError::UnexpectedIndex { uri: child_uri });
            }
            list.extend(doc.into_change_list()?);
        }
        Ok(list)
    }

    /// Resolves a child location listed in the index at `index_uri`.
    ///
    /// Children of a local index are looked up through the mapper, so that an
    /// index published with remote URIs can be read from a local copy.
    fn resolve_child(&self, index_uri: &str, child: &str) -> String {
        if is_local(index_uri) {
            if let Ok(path) = self.mapper.src_to_dst(child) {
                debug!(child = %child, path = %path.display(), "mapped child document");
                return path.to_string_lossy().into_owned();
            }
        }
        child.to_string()
    }
}

/// Returns the path of chunk `n` of a paginated write to `path`.
pub fn chunk_path(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{n:05}.{}", ext.to_string_lossy()),
        None => format!("{stem}{n:05}"),
    };
    path.with_file_name(name)
}

fn write_file(path: &Path, xml: &str) -> CodecResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CodecError::io(parent, &e))?;
    }
    fs::write(path, xml).map_err(|e| CodecError::io(path, &e))
}
