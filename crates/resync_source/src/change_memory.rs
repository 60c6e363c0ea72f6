//! Bounded in-memory log of change records.
//!
//! The memory assigns consecutive change ids starting at 1 and keeps at most
//! `max_changes` records, evicting the oldest. Two counters describe the
//! window:
//!
//! - `first_change_id`: oldest retained id (`latest + 1` when nothing is
//!   retained)
//! - `latest_change_id`: most recently issued id (`0` before any change)
//!
//! A client resuming from id `n` is served when `first <= n <= latest`. The
//! id `latest + 1` means the client is caught up; anything else is unknown.

use parking_lot::RwLock;
use resync_protocol::{
    rel, Capability, ChangeKind, ChangeList, ChangeRecord, Resource, CHANGELIST_TYPE,
};
use std::collections::VecDeque;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::event_bus::{OnResourceChanged, ResourceChange};

/// Path of the dynamic change list relative to the base URI.
pub const CHANGELIST_PATH: &str = "/changelist.xml";

/// How many change records are retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Keep every record.
    #[default]
    Unbounded,
    /// Keep the most recent `n` records.
    MaxChanges(usize),
}

impl From<Option<usize>> for Retention {
    fn from(max: Option<usize>) -> Self {
        max.map_or(Retention::Unbounded, Retention::MaxChanges)
    }
}

/// Where a change id falls relative to the retained window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeIdPosition {
    /// Within `first..=latest`.
    Known,
    /// Issued but no longer retained.
    Evicted,
    /// Exactly `latest + 1`: nothing newer yet.
    CaughtUp,
    /// Beyond `latest + 1`, or zero.
    NotIssued,
}

/// Change log for one source.
#[derive(Debug, Clone)]
pub struct ChangeMemory {
    base_uri: String,
    retention: Retention,
    changes: VecDeque<ChangeRecord>,
    first_change_id: u64,
    latest_change_id: u64,
}

impl ChangeMemory {
    /// Creates an empty memory publishing under `base_uri`.
    pub fn new(base_uri: impl Into<String>, retention: Retention) -> Self {
        Self {
            base_uri: base_uri.into().trim_end_matches('/').to_string(),
            retention,
            changes: VecDeque::new(),
            first_change_id: 1,
            latest_change_id: 0,
        }
    }

    /// Records a change and returns it with its assigned id.
    pub fn notify(&mut self, resource: Resource, kind: ChangeKind) -> ChangeRecord {
        let id = self.latest_change_id + 1;
        let record = ChangeRecord::new(resource, kind, id);
        self.changes.push_back(record.clone());
        self.latest_change_id = id;

        if let Retention::MaxChanges(max) = self.retention {
            while self.changes.len() > max {
                self.changes.pop_front();
            }
        }
        self.first_change_id = self.changes.front().map_or(id + 1, |c| c.change_id);

        debug!(
            change_id = id,
            kind = %kind,
            first = self.first_change_id,
            "recorded change"
        );
        record
    }

    /// Oldest retained change id.
    pub fn first_change_id(&self) -> u64 {
        self.first_change_id
    }

    /// Most recently issued change id.
    pub fn latest_change_id(&self) -> u64 {
        self.latest_change_id
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if no record is retained.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Classifies `id` against the retained window.
    pub fn position(&self, id: u64) -> ChangeIdPosition {
        if id == 0 {
            ChangeIdPosition::NotIssued
        } else if id >= self.first_change_id && id <= self.latest_change_id {
            ChangeIdPosition::Known
        } else if id == self.latest_change_id + 1 {
            ChangeIdPosition::CaughtUp
        } else if id < self.first_change_id {
            ChangeIdPosition::Evicted
        } else {
            ChangeIdPosition::NotIssued
        }
    }

    /// Returns true if the record with `id` is retained.
    pub fn knows_change_id(&self, id: u64) -> bool {
        self.position(id) == ChangeIdPosition::Known
    }

    /// Returns the records with `change_id >= id`, oldest first.
    pub fn changes_from(&self, id: u64) -> SourceResult<Vec<ChangeRecord>> {
        if !self.knows_change_id(id) {
            return Err(self.unknown(id));
        }
        let offset = (id - self.first_change_id) as usize;
        Ok(self.changes.iter().skip(offset).cloned().collect())
    }

    /// Returns the change list starting at `from`, or at the oldest retained
    /// change.
    ///
    /// The list links to itself as `current` and to the first id after it as
    /// `next`. A caught-up `from` yields an empty list.
    pub fn generate(&self, from: Option<u64>) -> SourceResult<ChangeList> {
        let from = from.unwrap_or(self.first_change_id);
        let changes = match self.position(from) {
            ChangeIdPosition::Known => self.changes_from(from)?,
            ChangeIdPosition::CaughtUp => Vec::new(),
            ChangeIdPosition::Evicted | ChangeIdPosition::NotIssued => {
                return Err(self.unknown(from))
            }
        };

        let mut list = ChangeList::from_changes(changes);
        let current = self.changelist_uri(Some(from));
        let next = self.changelist_uri(Some(self.latest_change_id + 1));
        if current == next {
            list.add_capability(
                current,
                Capability::new([rel::CURRENT, rel::NEXT]).with_type(CHANGELIST_TYPE),
            );
        } else {
            list.add_capability(
                current,
                Capability::new([rel::CURRENT]).with_type(CHANGELIST_TYPE),
            );
            list.add_capability(next, Capability::new([rel::NEXT]).with_type(CHANGELIST_TYPE));
        }
        Ok(list)
    }

    /// Returns the URI of the change list starting at `from`.
    ///
    /// Without `from` the URI names the list from the oldest retained change.
    pub fn changelist_uri(&self, from: Option<u64>) -> String {
        match from {
            Some(id) => format!("{}{CHANGELIST_PATH}?from={id}", self.base_uri),
            None => format!("{}{CHANGELIST_PATH}", self.base_uri),
        }
    }

    fn unknown(&self, id: u64) -> SourceError {
        SourceError::UnknownChangeId {
            requested: id,
            first: self.first_change_id,
            latest: self.latest_change_id,
        }
    }
}

/// A [`ChangeMemory`] shared between the publishing and serving sides.
///
/// `notify` takes the write lock; every reader gets an owned snapshot.
#[derive(Debug)]
pub struct SharedChangeMemory {
    inner: RwLock<ChangeMemory>,
}

impl SharedChangeMemory {
    /// Wraps a change memory.
    pub fn new(memory: ChangeMemory) -> Self {
        Self {
            inner: RwLock::new(memory),
        }
    }

    /// Records a change.
    pub fn notify(&self, resource: Resource, kind: ChangeKind) -> ChangeRecord {
        self.inner.write().notify(resource, kind)
    }

    /// See [`ChangeMemory::changes_from`].
    pub fn changes_from(&self, id: u64) -> SourceResult<Vec<ChangeRecord>> {
        self.inner.read().changes_from(id)
    }

    /// See [`ChangeMemory::generate`].
    pub fn generate(&self, from: Option<u64>) -> SourceResult<ChangeList> {
        self.inner.read().generate(from)
    }

    /// See [`ChangeMemory::position`].
    pub fn position(&self, id: u64) -> ChangeIdPosition {
        self.inner.read().position(id)
    }

    /// See [`ChangeMemory::changelist_uri`].
    pub fn changelist_uri(&self, from: Option<u64>) -> String {
        self.inner.read().changelist_uri(from)
    }

    /// Returns `(first_change_id, latest_change_id)`.
    pub fn window(&self) -> (u64, u64) {
        let memory = self.inner.read();
        (memory.first_change_id, memory.latest_change_id)
    }

    /// Returns a copy of the memory.
    pub fn snapshot(&self) -> ChangeMemory {
        self.inner.read().clone()
    }
}

impl OnResourceChanged for SharedChangeMemory {
    fn on_resource_changed(&self, change: &ResourceChange) {
        self.notify(change.resource.clone(), change.kind);
    }
}
