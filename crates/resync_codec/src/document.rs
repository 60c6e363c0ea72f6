//! Parsed document model and dialect names.

use resync_protocol::{
    AddOutcome, Capabilities, ChangeKind, ChangeList, ChangeRecord, DupePolicy, Resource,
    ResourceSet,
};
use tracing::warn;

use crate::error::{CodecError, CodecResult};

/// Namespace of the sitemap schema.
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Namespace of the extension elements.
pub const RS_NS: &str = "http://www.openarchives.org/rs/terms/";

/// Namespace of capability links.
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Root element of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `<urlset>`: an inventory or a change list.
    UrlSet,
    /// `<sitemapindex>`: a list of child documents.
    Index,
}

/// One `<url>` or `<sitemap>` entry.
///
/// The change kind and id are only present when the document carried the
/// change extension elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Resource described by the entry.
    pub resource: Resource,
    /// Change kind, for change records.
    pub change_kind: Option<ChangeKind>,
    /// Change id, for change records.
    pub change_id: Option<u64>,
}

impl Entry {
    /// Creates an entry without change information.
    pub fn resource(resource: Resource) -> Self {
        Self {
            resource,
            change_kind: None,
            change_id: None,
        }
    }
}

/// A parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Where the document was read from.
    pub uri: String,
    /// Root element.
    pub kind: DocumentKind,
    /// Capability links at the root.
    pub capabilities: Capabilities,
    /// Entries in document order.
    pub entries: Vec<Entry>,
}

impl Document {
    /// Returns true for a sitemap index.
    pub fn is_index(&self) -> bool {
        self.kind == DocumentKind::Index
    }

    /// Adds the entries to `set`, resolving repeated URIs with `policy`.
    pub fn merge_into(self, set: &mut ResourceSet, policy: DupePolicy) -> CodecResult<()> {
        for (href, capability) in self.capabilities.iter() {
            set.add_capability(href, capability.clone());
        }
        for entry in self.entries {
            let uri = entry.resource.uri.clone();
            match set.add_with(entry.resource, policy)? {
                AddOutcome::Inserted => {}
                AddOutcome::Replaced => warn!(uri = %uri, document = %self.uri, "dupe resource, replaced"),
                AddOutcome::Skipped => warn!(uri = %uri, document = %self.uri, "dupe resource, skipped"),
            }
        }
        Ok(())
    }

    /// Converts the entries into a resource set.
    pub fn into_resource_set(self, policy: DupePolicy) -> CodecResult<ResourceSet> {
        let mut set = ResourceSet::new();
        self.merge_into(&mut set, policy)?;
        Ok(set)
    }

    /// Converts the entries into a change list, keeping document order.
    ///
    /// Every entry must carry a change kind.
    pub fn into_change_list(self) -> CodecResult<ChangeList> {
        let mut list = ChangeList::new();
        *list.capabilities_mut() = self.capabilities;
        for entry in self.entries {
            let kind = entry.change_kind.ok_or_else(|| {
                CodecError::format(
                    &self.uri,
                    format!("entry {} has no rs:changetype", entry.resource.uri),
                )
            })?;
            list.push(ChangeRecord::new(
                entry.resource,
                kind,
                entry.change_id.unwrap_or(0),
            ));
        }
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(entries: Vec<Entry>) -> Document {
        Document {
            uri: "http://e.org/sitemap.xml".into(),
            kind: DocumentKind::UrlSet,
            capabilities: Capabilities::new(),
            entries,
        }
    }

    #[test]
    fn dupes_follow_policy() {
        let entries = vec![
            Entry::resource(Resource::new("a").with_size(1)),
            Entry::resource(Resource::new("a").with_size(2)),
        ];

        let set = doc(entries.clone()).into_resource_set(DupePolicy::Replace).unwrap();
        assert_eq!(set.get("a").unwrap().size, Some(2));

        let set = doc(entries.clone()).into_resource_set(DupePolicy::Skip).unwrap();
        assert_eq!(set.get("a").unwrap().size, Some(1));

        assert!(doc(entries).into_resource_set(DupePolicy::Error).is_err());
    }

    #[test]
    fn change_list_requires_kind() {
        let err = doc(vec![Entry::resource(Resource::new("a"))])
            .into_change_list()
            .unwrap_err();
        assert!(matches!(err, CodecError::Format { .. }));
    }
}
