//! Property tests for inventory comparison.

use proptest::prelude::*;
use resync_protocol::{compare, Resource, ResourceSet};
use resync_testkit::generators::{arb_resource_set, arb_timestamp};
use std::collections::BTreeSet;

fn uris(resources: &[Resource]) -> BTreeSet<&str> {
    resources.iter().map(|r| r.uri.as_str()).collect()
}

proptest! {
    #[test]
    fn compare_partitions_union(dst in arb_resource_set(20), src in arb_resource_set(20)) {
        let diff = compare(&dst, &src);

        let union: BTreeSet<&str> = dst.uris().chain(src.uris()).collect();
        prop_assert_eq!(diff.total(), union.len());

        let updated = uris(&diff.updated);
        let deleted = uris(&diff.deleted);
        let created = uris(&diff.created);
        prop_assert!(updated.is_disjoint(&deleted));
        prop_assert!(updated.is_disjoint(&created));
        prop_assert!(deleted.is_disjoint(&created));

        for uri in &deleted {
            prop_assert!(dst.contains(uri) && !src.contains(uri));
        }
        for uri in &created {
            prop_assert!(src.contains(uri) && !dst.contains(uri));
        }
        for uri in &updated {
            prop_assert!(dst.contains(uri) && src.contains(uri));
        }
    }

    #[test]
    fn compare_with_self_is_in_sync(set in arb_resource_set(30)) {
        let diff = compare(&set, &set);

        prop_assert_eq!(diff.same, set.len());
        prop_assert!(diff.in_sync());
    }

    #[test]
    fn outputs_are_sorted(dst in arb_resource_set(20), src in arb_resource_set(20)) {
        let diff = compare(&dst, &src);

        for list in [&diff.updated, &diff.deleted, &diff.created] {
            prop_assert!(list.windows(2).all(|w| w[0].uri < w[1].uri));
        }
    }

    #[test]
    fn near_eq_is_symmetric(ts in arb_timestamp(), offset_ms in -2000i64..2000) {
        let a = Resource::new("x").with_last_modified(ts);
        let b = Resource::new("x").with_last_modified(ts + chrono::Duration::milliseconds(offset_ms));

        prop_assert_eq!(a.near_eq(&b), b.near_eq(&a));
        prop_assert_eq!(a.near_eq(&b), offset_ms.abs() < 1000);
    }
}

#[test]
fn empty_sets() {
    let diff = compare(&ResourceSet::new(), &ResourceSet::new());
    assert_eq!(diff.total(), 0);
    assert!(diff.in_sync());
}
