//! Change records and change lists.

use crate::capability::{Capabilities, Capability};
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of change applied to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// Resource appeared.
    Created,
    /// Resource content changed.
    Updated,
    /// Resource disappeared.
    Deleted,
}

impl ChangeKind {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "CREATED",
            ChangeKind::Updated => "UPDATED",
            ChangeKind::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    /// Accepts the wire names in any case, plus the verb forms
    /// (`create`, `update`, `delete`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" | "create" => Ok(ChangeKind::Created),
            "updated" | "update" => Ok(ChangeKind::Updated),
            "deleted" | "delete" => Ok(ChangeKind::Deleted),
            other => Err(format!("unknown change kind: {other}")),
        }
    }
}

/// A resource together with what happened to it.
///
/// Change ids are assigned by the source, start at 1 and strictly increase.
/// Records read from a document without an id carry `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Source-assigned change id.
    pub change_id: u64,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Resource state after the change.
    #[serde(flatten)]
    pub resource: Resource,
}

impl ChangeRecord {
    /// Creates a change record.
    pub fn new(resource: Resource, kind: ChangeKind, change_id: u64) -> Self {
        Self {
            change_id,
            kind,
            resource,
        }
    }

    /// Returns the resource URI.
    pub fn uri(&self) -> &str {
        &self.resource.uri
    }
}

/// An ordered collection of changes.
///
/// Unlike a [`ResourceSet`](crate::ResourceSet), a change list keeps
/// document order and may mention a URI more than once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeList {
    changes: Vec<ChangeRecord>,
    capabilities: Capabilities,
}

impl ChangeList {
    /// Creates an empty change list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a change list from records in order.
    pub fn from_changes(changes: Vec<ChangeRecord>) -> Self {
        Self {
            changes,
            capabilities: Capabilities::new(),
        }
    }

    /// Appends a change.
    pub fn push(&mut self, change: ChangeRecord) {
        self.changes.push(change);
    }

    /// Iterates changes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.changes.iter()
    }

    /// Returns the changes as a slice.
    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    /// Returns the number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the capability table.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Returns the capability table for modification.
    pub fn capabilities_mut(&mut self) -> &mut Capabilities {
        &mut self.capabilities
    }

    /// Adds a capability link.
    pub fn add_capability(&mut self, href: impl Into<String>, capability: Capability) {
        self.capabilities.insert(href, capability);
    }

    /// Returns the hrefs carrying relation `rel`.
    pub fn links(&self, rel: &str) -> Vec<&str> {
        self.capabilities.hrefs_with_rel(rel)
    }

    /// Appends all changes of `other`, keeping order.
    pub fn extend(&mut self, other: ChangeList) {
        self.changes.extend(other.changes);
    }

    /// Count of changes per kind as `(created, updated, deleted)`.
    pub fn counts(&self) -> (usize, usize, usize) {
        self.changes
            .iter()
            .fold((0, 0, 0), |(c, u, d), change| match change.kind {
                ChangeKind::Created => (c + 1, u, d),
                ChangeKind::Updated => (c, u + 1, d),
                ChangeKind::Deleted => (c, u, d + 1),
            })
    }
}

impl IntoIterator for ChangeList {
    type Item = ChangeRecord;
    type IntoIter = std::vec::IntoIter<ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
