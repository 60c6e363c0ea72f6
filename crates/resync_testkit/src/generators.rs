//! Property-based test generators using proptest.
//!
//! Provides strategies for resources and inventories. Generated URIs share
//! [`BASE_URI`](crate::fixtures::BASE_URI) so sets drawn independently
//! overlap often enough to exercise every diff class.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use resync_protocol::{Resource, ResourceSet};

/// Strategy for timestamps between 2000 and 2030 with microsecond precision.
pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800i64..1_893_456_000i64, 0u32..1_000_000u32).prop_map(|(secs, micros)| {
        Utc.timestamp_opt(secs, micros * 1000)
            .single()
            .expect("timestamp in range")
    })
}

/// Strategy for URI path names drawn from a small alphabet.
pub fn arb_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-e]{1,2}(/[a-e]{1,2})?").expect("Invalid regex")
}

/// Strategy for a resource under the fixture base URI.
pub fn arb_resource() -> impl Strategy<Value = Resource> {
    (
        arb_name(),
        prop::option::of(arb_timestamp()),
        prop::option::of(0u64..10_000),
        prop::option::of(prop::string::string_regex("[0-9a-f]{32}").expect("Invalid regex")),
    )
        .prop_map(|(name, ts, size, checksum)| Resource {
            uri: crate::fixtures::uri(&name),
            last_modified: ts,
            size,
            checksum,
        })
}

/// Strategy for a resource set of up to `max` entries.
pub fn arb_resource_set(max: usize) -> impl Strategy<Value = ResourceSet> {
    prop::collection::vec(arb_resource(), 0..=max).prop_map(|v| v.into_iter().collect())
}
