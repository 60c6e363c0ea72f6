//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resync_protocol::{ChangeKind, ChangeList, ChangeRecord, Resource, ResourceSet};

/// Base URI of generated resources.
pub const BASE_URI: &str = "http://bench.example.org/rs";

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000, 0).single().unwrap_or_default()
}

/// Generates `count` resources with sizes, timestamps and checksums.
pub fn generate_set(count: usize, seed: u64) -> ResourceSet {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            Resource::new(format!("{BASE_URI}/res/{i:08}"))
                .with_size(rng.gen_range(1..100_000))
                .with_last_modified(epoch() + Duration::seconds(rng.gen_range(0..86_400)))
                .with_checksum(format!("{:032x}", rng.gen::<u128>()))
        })
        .collect()
}

/// Returns a copy of `set` in which roughly `fraction` of the resources
/// were updated, deleted or replaced by new ones.
pub fn mutate(set: &ResourceSet, fraction: f64, seed: u64) -> ResourceSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = ResourceSet::new();
    for (i, resource) in set.iter().enumerate() {
        if !rng.gen_bool(fraction) {
            let _ = out.add(resource.clone());
            continue;
        }
        match rng.gen_range(0..3) {
            0 => {
                let _ = out.add(resource.clone().with_size(rng.gen_range(1..100_000)));
            }
            1 => {}
            _ => {
                let _ = out.add(Resource::new(format!("{BASE_URI}/new/{i:08}")).with_size(1));
            }
        }
    }
    out
}

/// Generates a change list of `count` records over `distinct` URIs.
pub fn generate_changes(count: usize, distinct: usize, seed: u64) -> ChangeList {
    let mut rng = StdRng::seed_from_u64(seed);
    let changes = (0..count)
        .map(|i| {
            let kind = match rng.gen_range(0..3) {
                0 => ChangeKind::Created,
                1 => ChangeKind::Updated,
                _ => ChangeKind::Deleted,
            };
            let resource = Resource::new(format!("{BASE_URI}/res/{:08}", rng.gen_range(0..distinct.max(1))))
                .with_size(rng.gen_range(1..10_000))
                .with_last_modified(epoch() + Duration::seconds(i as i64));
            ChangeRecord::new(resource, kind, i as u64 + 1)
        })
        .collect();
    ChangeList::from_changes(changes)
}
