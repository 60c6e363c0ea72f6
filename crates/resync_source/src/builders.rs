//! Publishers that write documents into the static directory.

use parking_lot::Mutex;
use resync_codec::{Sitemap, Written};
use resync_protocol::{
    rel, Capability, ChangeList, ChangeRecord, Mapper, ResourceSet, CHANGELIST_TYPE,
};
use std::mem;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::SourceResult;
use crate::event_bus::{OnResourceChanged, ResourceChange};

/// Path under which static documents are served.
pub const STATIC_PATH: &str = "/static";

/// File name of the static resource list.
pub const RESOURCELIST_FILE: &str = "resourcelist.xml";

/// Returns the URI prefix of static documents below `base_uri`.
pub fn static_uri(base_uri: &str) -> String {
    format!("{}{STATIC_PATH}", base_uri.trim_end_matches('/'))
}

/// Returns the file name of static change list number `n`.
pub fn changelist_file(n: usize) -> String {
    format!("changelist{n:05}.xml")
}

/// Writes the resource list into the static directory.
#[derive(Debug, Clone)]
pub struct StaticResourceList {
    dir: PathBuf,
    sitemap: Sitemap,
}

impl StaticResourceList {
    /// Creates a writer for `dir`, published under `base_uri`.
    pub fn new(base_uri: &str, dir: impl Into<PathBuf>, max_entries: usize) -> SourceResult<Self> {
        let dir = dir.into();
        let mapper = Mapper::single(static_uri(base_uri), &dir).map_err(resync_codec::CodecError::from)?;
        Ok(Self {
            dir,
            sitemap: Sitemap::new().with_max_entries(max_entries).with_mapper(mapper),
        })
    }

    /// Path of the resource list (or its index).
    pub fn path(&self) -> PathBuf {
        self.dir.join(RESOURCELIST_FILE)
    }

    /// Writes `set`, paginating when it exceeds the entry limit.
    pub fn write(&self, set: &ResourceSet) -> SourceResult<Written> {
        let written = self.sitemap.write(set, &self.path())?;
        info!(
            dir = %self.dir.display(),
            resources = set.len(),
            documents = written.documents.len(),
            "wrote static resource list"
        );
        Ok(written)
    }
}

#[derive(Debug, Default)]
struct StaticState {
    pending: Vec<ChangeRecord>,
    next_id: u64,
    written: Vec<PathBuf>,
}

/// Buffers changes and writes a numbered change list every `max_changes`.
///
/// Each file after the first links to its predecessor with `previous`.
#[derive(Debug)]
pub struct StaticChangeList {
    dir: PathBuf,
    base_uri: String,
    max_changes: usize,
    sitemap: Sitemap,
    state: Mutex<StaticState>,
}

impl StaticChangeList {
    /// Creates a writer for `dir`, published under `base_uri`.
    pub fn new(base_uri: &str, dir: impl Into<PathBuf>, max_changes: usize) -> Self {
        let max_changes = max_changes.max(1);
        Self {
            dir: dir.into(),
            base_uri: static_uri(base_uri),
            max_changes,
            sitemap: Sitemap::new().with_max_entries(max_changes),
            state: Mutex::new(StaticState {
                next_id: 1,
                ..StaticState::default()
            }),
        }
    }

    /// Adds a change, writing a file when the buffer is full.
    pub fn record(&self, change: &ResourceChange) -> SourceResult<Option<PathBuf>> {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state
            .pending
            .push(ChangeRecord::new(change.resource.clone(), change.kind, id));
        if state.pending.len() >= self.max_changes {
            return self.flush_locked(&mut state).map(Some);
        }
        Ok(None)
    }

    /// Writes buffered changes, if any.
    pub fn flush(&self) -> SourceResult<Option<PathBuf>> {
        let mut state = self.state.lock();
        if state.pending.is_empty() {
            return Ok(None);
        }
        self.flush_locked(&mut state).map(Some)
    }

    fn flush_locked(&self, state: &mut StaticState) -> SourceResult<PathBuf> {
        let path = self.dir.join(changelist_file(state.written.len()));
        let mut list = ChangeList::from_changes(mem::take(&mut state.pending));
        if let Some(previous) = state.written.last() {
            list.add_capability(
                self.file_uri(previous),
                Capability::new([rel::PREVIOUS]).with_type(CHANGELIST_TYPE),
            );
        }
        self.sitemap.write_change_list(&list, &path)?;
        info!(path = %path.display(), changes = list.len(), "wrote static change list");
        state.written.push(path.clone());
        Ok(path)
    }

    /// Files written so far, oldest first.
    pub fn files(&self) -> Vec<PathBuf> {
        self.state.lock().written.clone()
    }

    /// Number of changes waiting for the next file.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// URI of the most recently written file.
    pub fn latest_uri(&self) -> Option<String> {
        self.state.lock().written.last().map(|p| self.file_uri(p))
    }

    fn file_uri(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{name}", self.base_uri)
    }
}

impl OnResourceChanged for StaticChangeList {
    fn on_resource_changed(&self, change: &ResourceChange) {
        if let Err(e) = self.record(change) {
            error!(uri = %change.resource.uri, error = %e, "failed to write static change list");
        }
    }
}
