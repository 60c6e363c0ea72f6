//! Inventory of resources keyed by URI.

use crate::capability::{Capabilities, Capability};
use crate::error::{ProtocolError, ProtocolResult};
use crate::resource::Resource;
use std::collections::BTreeMap;

/// What to do when a URI is added twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DupePolicy {
    /// Reject the second resource with `DupeResource`.
    #[default]
    Error,
    /// Keep the second resource.
    Replace,
    /// Keep the first resource.
    Skip,
}

/// Result of adding a resource under a [`DupePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The URI was new.
    Inserted,
    /// An existing entry was replaced.
    Replaced,
    /// The resource was dropped in favour of the existing entry.
    Skipped,
}

/// A set of resources with unique URIs, iterated in URI order.
///
/// Besides the resources, a set carries the capability links of the
/// document it was read from (or will be written to).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSet {
    resources: BTreeMap<String, Resource>,
    capabilities: Capabilities,
}

impl ResourceSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource, failing if the URI is already present.
    pub fn add(&mut self, resource: Resource) -> ProtocolResult<()> {
        self.add_with(resource, DupePolicy::Error).map(|_| ())
    }

    /// Adds a resource, resolving duplicates with `policy`.
    pub fn add_with(&mut self, resource: Resource, policy: DupePolicy) -> ProtocolResult<AddOutcome> {
        if !self.resources.contains_key(&resource.uri) {
            self.resources.insert(resource.uri.clone(), resource);
            return Ok(AddOutcome::Inserted);
        }

        match policy {
            DupePolicy::Error => Err(ProtocolError::DupeResource { uri: resource.uri }),
            DupePolicy::Replace => {
                self.resources.insert(resource.uri.clone(), resource);
                Ok(AddOutcome::Replaced)
            }
            DupePolicy::Skip => Ok(AddOutcome::Skipped),
        }
    }

    /// Removes and returns the resource with `uri`.
    pub fn remove(&mut self, uri: &str) -> Option<Resource> {
        self.resources.remove(uri)
    }

    /// Returns the resource with `uri`.
    pub fn get(&self, uri: &str) -> Option<&Resource> {
        self.resources.get(uri)
    }

    /// Returns true if `uri` is in the set.
    pub fn contains(&self, uri: &str) -> bool {
        self.resources.contains_key(uri)
    }

    /// Iterates resources in URI order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Iterates URIs in sorted order.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Returns the number of resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the set has no resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns true if every resource carries a checksum.
    pub fn has_checksums(&self) -> bool {
        !self.is_empty() && self.iter().all(|r| r.checksum.is_some())
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

    /// Returns `len` resources starting at URI-order position `offset`.
    pub fn chunk(&self, offset: usize, len: usize) -> impl Iterator<Item = &Resource> {
        self.resources.values().skip(offset).take(len)
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a Resource;
    type IntoIter = std::collections::btree_map::Values<'a, String, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.values()
    }
}

impl IntoIterator for ResourceSet {
    type Item = Resource;
    type IntoIter = std::collections::btree_map::IntoValues<String, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_values()
    }
}

/// Collects resources; later duplicates replace earlier ones.
impl FromIterator<Resource> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        let mut set = ResourceSet::new();
        for resource in iter {
            set.resources.insert(resource.uri.clone(), resource);
        }
        set
    }
}
