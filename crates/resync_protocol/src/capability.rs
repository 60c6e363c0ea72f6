//! Capability links between documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of a document that lists changes.
pub const CHANGELIST_TYPE: &str = "http://www.openarchives.org/rs/changelist";

/// Type of a document that lists the full inventory.
pub const RESOURCELIST_TYPE: &str = "http://www.openarchives.org/rs/resourcelist";

/// Link relations used for changelist navigation.
pub mod rel {
    /// Where a client resumes from.
    pub const CURRENT: &str = "current";
    /// Window to request after consuming this one.
    pub const NEXT: &str = "next";
    /// Older window.
    pub const PREV: &str = "prev";
    /// Older window (long form).
    pub const PREVIOUS: &str = "previous";
}

/// Descriptor of a link to a related document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Document type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Relations, in document order.
    #[serde(default)]
    pub rel: Vec<String>,
}

impl Capability {
    /// Creates a capability with the given relations.
    pub fn new<I, S>(rel: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: None,
            rel: rel.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets the document type.
    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Returns true if the relation list contains `rel`.
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rel.iter().any(|r| r == rel)
    }

    /// Parses a space-separated relation list.
    pub fn parse_rel(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    /// Returns the relations joined with single spaces.
    pub fn rel_text(&self) -> String {
        self.rel.join(" ")
    }
}

/// Capabilities of a document keyed by href.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities(BTreeMap<String, Capability>);

impl Capabilities {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds or replaces the capability for `href`.
    pub fn insert(&mut self, href: impl Into<String>, capability: Capability) {
        self.0.insert(href.into(), capability);
    }

    /// Returns the capability for `href`.
    pub fn get(&self, href: &str) -> Option<&Capability> {
        self.0.get(href)
    }

    /// Returns the hrefs carrying relation `rel`, in href order.
    pub fn hrefs_with_rel(&self, rel: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, cap)| cap.has_rel(rel))
            .map(|(href, _)| href.as_str())
            .collect()
    }

    /// Iterates capabilities in href order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Capability)> {
        self.0.iter().map(|(href, cap)| (href.as_str(), cap))
    }

    /// Returns the number of capabilities.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no capabilities.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
