//! Inventory comparison.

use crate::change::{ChangeKind, ChangeList, ChangeRecord};
use crate::resource::Resource;
use crate::resource_set::ResourceSet;
use std::cmp::Ordering;

/// Classification of every URI in two inventories.
///
/// `updated` and `created` hold the source version of each resource,
/// `deleted` holds the destination version. All three are in URI order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    /// Number of resources that are near-equal on both sides.
    pub same: usize,
    /// Present on both sides but different.
    pub updated: Vec<Resource>,
    /// Present only at the destination.
    pub deleted: Vec<Resource>,
    /// Present only at the source.
    pub created: Vec<Resource>,
}

impl Diff {
    /// Returns true if nothing needs to change.
    pub fn in_sync(&self) -> bool {
        self.updated.is_empty() && self.deleted.is_empty() && self.created.is_empty()
    }

    /// Total number of URIs classified.
    pub fn total(&self) -> usize {
        self.same + self.updated.len() + self.deleted.len() + self.created.len()
    }

    /// Reifies the diff as changes numbered from `first_id`.
    ///
    /// Updates come first, then deletions, then creations.
    pub fn into_change_list(self, first_id: u64) -> ChangeList {
        let tagged = self
            .updated
            .into_iter()
            .map(|r| (r, ChangeKind::Updated))
            .chain(self.deleted.into_iter().map(|r| (r, ChangeKind::Deleted)))
            .chain(self.created.into_iter().map(|r| (r, ChangeKind::Created)));

        let changes = tagged
            .zip(first_id..)
            .map(|((resource, kind), id)| ChangeRecord::new(resource, kind, id))
            .collect();
        ChangeList::from_changes(changes)
    }
}

/// Compares a destination inventory against a source inventory.
///
/// Walks both URI-sorted sequences once. A URI only at the destination is
/// deleted, a URI only at the source is created, and a URI on both sides is
/// same or updated according to [`Resource::near_eq`].
pub fn compare(destination: &ResourceSet, source: &ResourceSet) -> Diff {
    let mut diff = Diff::default();
    let mut dst = destination.iter().peekable();
    let mut src = source.iter().peekable();

    loop {
        let order = match (dst.peek(), src.peek()) {
            (Some(d), Some(s)) => d.uri.cmp(&s.uri),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };

        match order {
            Ordering::Equal => {
                if let (Some(d), Some(s)) = (dst.next(), src.next()) {
                    if d.near_eq(s) {
                        diff.same += 1;
                    } else {
                        diff.updated.push(s.clone());
                    }
                }
            }
            Ordering::Less => {
                if let Some(d) = dst.next() {
                    diff.deleted.push(d.clone());
                }
            }
            Ordering::Greater => {
                if let Some(s) = src.next() {
                    diff.created.push(s.clone());
                }
            }
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn set(entries: &[(&str, u64)]) -> ResourceSet {
        let t0 = Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap();
        entries
            .iter()
            .map(|(uri, size)| Resource::new(*uri).with_size(*size).with_last_modified(t0))
            .collect()
    }

    fn uris(resources: &[Resource]) -> Vec<&str> {
        resources.iter().map(|r| r.uri.as_str()).collect()
    }

    #[test]
    fn identical_sets() {
        let a = set(&[("a", 1), ("b", 2)]);
        let diff = compare(&a, &a);

        assert_eq!(diff.same, 2);
        assert!(diff.in_sync());
    }

    #[test]
    fn classifies_each_kind() {
        let dst = set(&[("a", 1), ("b", 2), ("d", 4)]);
        let src = set(&[("a", 1), ("b", 3), ("c", 3), ("e", 5)]);

        let diff = compare(&dst, &src);

        assert_eq!(diff.same, 1);
        assert_eq!(uris(&diff.updated), vec!["b"]);
        assert_eq!(diff.updated[0].size, Some(3));
        assert_eq!(uris(&diff.deleted), vec!["d"]);
        assert_eq!(uris(&diff.created), vec!["c", "e"]);
        assert_eq!(diff.total(), 5);
    }

    #[test]
    fn trailing_entries() {
        let diff = compare(&set(&[("x", 1), ("y", 1)]), &ResourceSet::new());
        assert_eq!(uris(&diff.deleted), vec!["x", "y"]);

        let diff = compare(&ResourceSet::new(), &set(&[("x", 1), ("y", 1)]));
        assert_eq!(uris(&diff.created), vec!["x", "y"]);
    }

    #[test]
    fn timestamp_within_tolerance_is_same() {
        let t0 = Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap();
        let dst: ResourceSet = [Resource::new("a").with_last_modified(t0)].into_iter().collect();
        let near: ResourceSet = [Resource::new("a").with_last_modified(t0 + Duration::milliseconds(900))]
            .into_iter()
            .collect();
        let far: ResourceSet = [Resource::new("a").with_last_modified(t0 + Duration::milliseconds(1100))]
            .into_iter()
            .collect();

        assert_eq!(compare(&dst, &near).same, 1);
        assert_eq!(compare(&dst, &far).updated.len(), 1);
    }

    #[test]
    fn into_change_list_numbers_changes() {
        let dst = set(&[("a", 1), ("b", 2)]);
        let src = set(&[("a", 9), ("c", 3)]);

        let changes = compare(&dst, &src).into_change_list(11);
        let summary: Vec<_> = changes
            .iter()
            .map(|c| (c.change_id, c.kind, c.uri()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (11, ChangeKind::Updated, "a"),
                (12, ChangeKind::Deleted, "b"),
                (13, ChangeKind::Created, "c"),
            ]
        );
    }
}
