//! Simulated source repository.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resync_codec::Written;
use resync_protocol::{rel, Capability, ChangeKind, Resource, ResourceSet, CHANGELIST_TYPE};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::builders::{StaticChangeList, StaticResourceList};
use crate::change_memory::{ChangeMemory, SharedChangeMemory};
use crate::config::{CapabilityBuilder, SourceConfig};
use crate::error::{SourceError, SourceResult};
use crate::event_bus::{EventBus, LoggingSubscriber, ResourceChange};

/// Path under which resource payloads are served.
pub const RESOURCES_PATH: &str = "/resources";

#[derive(Debug, Clone, Copy)]
struct Stored {
    size: u64,
    last_modified: DateTime<Utc>,
}

#[derive(Debug)]
struct Repository {
    resources: BTreeMap<String, Stored>,
    next_name: u64,
    clock: DateTime<Utc>,
}

impl Repository {
    /// Advances the clock by one second so every change is distinguishable.
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::seconds(1);
        self.clock
    }
}

/// An in-memory repository whose changes are published on an [`EventBus`].
///
/// Resources are named by consecutive integers and served under
/// `<base_uri>/resources/<name>`. The payload of a resource is derived from
/// its name and timestamp, so it changes with every update.
#[derive(Debug)]
pub struct Source {
    config: SourceConfig,
    bus: EventBus,
    repository: RwLock<Repository>,
    rng: Mutex<StdRng>,
    dynamic_resource_list: bool,
    change_memory: Option<Arc<SharedChangeMemory>>,
    static_changes: Option<Arc<StaticChangeList>>,
    static_resources: Option<StaticResourceList>,
}

impl Source {
    /// Creates an empty source and wires up the configured builders.
    pub fn new(config: SourceConfig) -> SourceResult<Self> {
        config.validate()?;
        let base_uri = config.base_uri.trim_end_matches('/').to_string();
        let bus = EventBus::new();
        bus.register(Arc::new(LoggingSubscriber));

        let mut dynamic_resource_list = false;
        let mut change_memory = None;
        let mut static_changes = None;
        let mut static_resources = None;
        for builder in &config.builders {
            match builder {
                CapabilityBuilder::DynamicResourceList => dynamic_resource_list = true,
                CapabilityBuilder::StaticResourceList { max_sitemap_entries } => {
                    let dir = static_dir(&config)?;
                    static_resources =
                        Some(StaticResourceList::new(&base_uri, dir, *max_sitemap_entries)?);
                }
                CapabilityBuilder::DynamicChangeList { max_changes } => {
                    let memory = Arc::new(SharedChangeMemory::new(ChangeMemory::new(
                        base_uri.clone(),
                        (*max_changes).into(),
                    )));
                    bus.register(memory.clone());
                    change_memory = Some(memory);
                }
                CapabilityBuilder::StaticChangeList { max_changes } => {
                    let dir = static_dir(&config)?;
                    let writer = Arc::new(StaticChangeList::new(&base_uri, dir, *max_changes));
                    bus.register(writer.clone());
                    static_changes = Some(writer);
                }
            }
        }
        info!(base_uri = %base_uri, builders = config.builders.len(), "source ready");

        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config: SourceConfig { base_uri, ..config },
            bus,
            repository: RwLock::new(Repository {
                resources: BTreeMap::new(),
                next_name: 1,
                clock: Utc::now().trunc_subsecs(0),
            }),
            rng: Mutex::new(rng),
            dynamic_resource_list,
            change_memory,
            static_changes,
            static_resources,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Returns the URI prefix of all published documents.
    pub fn base_uri(&self) -> &str {
        &self.config.base_uri
    }

    /// Returns the event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Returns true if `/resourcelist.xml` is served from memory.
    pub fn serves_resource_list(&self) -> bool {
        self.dynamic_resource_list
    }

    /// Returns the dynamic change memory, if configured.
    pub fn change_memory(&self) -> Option<&Arc<SharedChangeMemory>> {
        self.change_memory.as_ref()
    }

    /// Returns the static change list writer, if configured.
    pub fn static_change_list(&self) -> Option<&Arc<StaticChangeList>> {
        self.static_changes.as_ref()
    }

    /// Creates `resource_count` resources without publishing changes.
    pub fn bootstrap(&self) {
        let mut rng = self.rng.lock();
        let mut repo = self.repository.write();
        let clock = repo.clock;
        for _ in 0..self.config.resource_count {
            let name = repo.next_name.to_string();
            repo.next_name += 1;
            let size = self.random_size(&mut *rng);
            repo.resources.insert(
                name,
                Stored {
                    size,
                    last_modified: clock,
                },
            );
        }
        info!(resources = repo.resources.len(), "bootstrapped source");
    }

    /// Creates a resource of `size` bytes and publishes the change.
    pub fn create(&self, size: u64) -> Resource {
        let mut repo = self.repository.write();
        let name = repo.next_name.to_string();
        repo.next_name += 1;
        let stored = Stored {
            size,
            last_modified: repo.tick(),
        };
        repo.resources.insert(name.clone(), stored);
        let resource = self.describe(&name, stored);
        self.bus.publish(&ResourceChange::created(resource.clone()));
        resource
    }

    /// Changes the size and timestamp of `basename` and publishes the change.
    pub fn update(&self, basename: &str, size: u64) -> SourceResult<Resource> {
        let mut repo = self.repository.write();
        let last_modified = repo.tick();
        let stored = repo
            .resources
            .get_mut(basename)
            .ok_or_else(|| not_found(basename))?;
        *stored = Stored {
            size,
            last_modified,
        };
        let resource = self.describe(basename, *stored);
        self.bus.publish(&ResourceChange::updated(resource.clone()));
        Ok(resource)
    }

    /// Removes `basename` and publishes the change.
    pub fn delete(&self, basename: &str) -> SourceResult<Resource> {
        let mut repo = self.repository.write();
        let stored = repo
            .resources
            .remove(basename)
            .ok_or_else(|| not_found(basename))?;
        let resource = self.describe(basename, stored);
        self.bus.publish(&ResourceChange::deleted(resource.clone()));
        Ok(resource)
    }

    /// Applies one random change.
    ///
    /// Creations, updates and deletions are equally likely; an empty
    /// repository always gets a creation.
    pub fn simulate_change<R: Rng>(&self, rng: &mut R) -> ResourceChange {
        let existing: Option<String> = {
            let repo = self.repository.read();
            if repo.resources.is_empty() {
                None
            } else {
                let index = rng.gen_range(0..repo.resources.len());
                repo.resources.keys().nth(index).cloned()
            }
        };

        let choice = rng.gen_range(0..3);
        let result = match (existing, choice) {
            (Some(name), 1) => {
                let size = self.random_size(rng);
                self.update(&name, size).map(ResourceChange::updated)
            }
            (Some(name), 2) => self.delete(&name).map(ResourceChange::deleted),
            _ => {
                let size = self.random_size(rng);
                Ok(ResourceChange::created(self.create(size)))
            }
        };
        // The picked resource may have been removed by another writer.
        result.unwrap_or_else(|e| {
            debug!(error = %e, "resource vanished, creating instead");
            let size = self.random_size(rng);
            ResourceChange::created(self.create(size))
        })
    }

    /// Applies `events` random changes with the source's own generator.
    pub fn simulate(&self, events: usize) -> Vec<ResourceChange> {
        let mut rng = self.rng.lock();
        let changes: Vec<_> = (0..events)
            .map(|_| self.simulate_change(&mut *rng))
            .collect();
        info!(events, resources = self.resource_count(), "simulation finished");
        changes
    }

    /// Number of resources currently held.
    pub fn resource_count(&self) -> usize {
        self.repository.read().resources.len()
    }

    /// Returns the published URI of `basename`.
    pub fn resource_uri(&self, basename: &str) -> String {
        format!("{}{RESOURCES_PATH}/{basename}", self.config.base_uri)
    }

    /// Returns the description of `basename`, if it exists.
    pub fn resource(&self, basename: &str) -> Option<Resource> {
        let repo = self.repository.read();
        repo.resources
            .get(basename)
            .map(|stored| self.describe(basename, *stored))
    }

    /// Returns the content of `basename`, if it exists.
    pub fn payload(&self, basename: &str) -> Option<Vec<u8>> {
        let stored = *self.repository.read().resources.get(basename)?;
        Some(payload_bytes(basename, stored))
    }

    /// Returns the current inventory with a `current` link per change list.
    pub fn resource_list(&self) -> ResourceSet {
        let mut set: ResourceSet = {
            let repo = self.repository.read();
            repo.resources
                .iter()
                .map(|(name, stored)| self.describe(name, *stored))
                .collect()
        };
        if let Some(memory) = &self.change_memory {
            set.add_capability(
                memory.changelist_uri(None),
                Capability::new([rel::CURRENT]).with_type(CHANGELIST_TYPE),
            );
        }
        if let Some(uri) = self.static_changes.as_ref().and_then(|s| s.latest_uri()) {
            set.add_capability(uri, Capability::new([rel::CURRENT]).with_type(CHANGELIST_TYPE));
        }
        set
    }

    /// Writes the static resource list, if that builder is configured.
    pub fn write_static_resource_list(&self) -> SourceResult<Option<Written>> {
        match &self.static_resources {
            Some(writer) => writer.write(&self.resource_list()).map(Some),
            None => Ok(None),
        }
    }

    /// Writes buffered static changes, if that builder is configured.
    pub fn flush_static_changes(&self) -> SourceResult<()> {
        if let Some(writer) = &self.static_changes {
            writer.flush()?;
        }
        Ok(())
    }

    fn describe(&self, basename: &str, stored: Stored) -> Resource {
        Resource::new(self.resource_uri(basename))
            .with_last_modified(stored.last_modified)
            .with_size(stored.size)
    }

    fn random_size<R: Rng>(&self, rng: &mut R) -> u64 {
        let average = self.config.average_payload;
        rng.gen_range((average / 2).max(1)..=average + average / 2)
    }
}

fn static_dir(config: &SourceConfig) -> SourceResult<&std::path::Path> {
    config
        .static_dir
        .as_deref()
        .ok_or_else(|| SourceError::Config("static builders need a static_dir".into()))
}

fn not_found(basename: &str) -> SourceError {
    SourceError::NotFound {
        path: format!("{RESOURCES_PATH}/{basename}"),
    }
}

/// Deterministic content for a resource of the given state.
fn payload_bytes(basename: &str, stored: Stored) -> Vec<u8> {
    let line = format!("{basename} {}\n", stored.last_modified.timestamp());
    line.bytes()
        .cycle()
        .take(stored.size as usize)
        .collect()
}

/// Returns the change kinds of `changes` as counts `(created, updated, deleted)`.
pub fn tally(changes: &[ResourceChange]) -> (usize, usize, usize) {
    changes.iter().fold((0, 0, 0), |(c, u, d), change| match change.kind {
        ChangeKind::Created => (c + 1, u, d),
        ChangeKind::Updated => (c, u + 1, d),
        ChangeKind::Deleted => (c, u, d + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASE: &str = "http://example.org/rs";

    fn small_config() -> SourceConfig {
        SourceConfig::new(BASE)
            .with_resource_count(5)
            .with_average_payload(20)
            .with_seed(42)
    }

    #[test]
    fn bootstrap_is_silent_and_deterministic() {
        let a = Source::new(small_config()).unwrap();
        let rx = a.bus().subscribe();
        a.bootstrap();
        assert_eq!(a.resource_count(), 5);
        assert!(rx.try_recv().is_err());
        assert_eq!(a.change_memory().unwrap().window(), (1, 0));

        let b = Source::new(small_config()).unwrap();
        b.bootstrap();
        for name in ["1", "2", "3", "4", "5"] {
            assert_eq!(a.resource(name).unwrap().size, b.resource(name).unwrap().size);
        }
    }

    #[test]
    fn mutations_publish_changes() {
        let source = Source::new(small_config()).unwrap();
        let rx = source.bus().subscribe();

        let created = source.create(10);
        assert_eq!(created.uri, format!("{BASE}/resources/1"));
        let updated = source.update("1", 12).unwrap();
        assert!(updated.last_modified > created.last_modified);
        source.delete("1").unwrap();

        let kinds: Vec<_> = rx.try_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]
        );
        assert_eq!(source.change_memory().unwrap().window(), (1, 3));

        assert!(matches!(
            source.update("1", 1),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn payload_matches_size_and_changes_on_update() {
        let source = Source::new(small_config()).unwrap();
        source.create(33);
        let before = source.payload("1").unwrap();
        assert_eq!(before.len(), 33);

        source.update("1", 33).unwrap();
        let after = source.payload("1").unwrap();
        assert_eq!(after.len(), 33);
        assert_ne!(before, after);
        assert!(source.payload("2").is_none());
    }

    #[test]
    fn simulation_counts() {
        let source = Source::new(small_config()).unwrap();
        source.bootstrap();
        let changes = source.simulate(30);
        assert_eq!(changes.len(), 30);

        let (created, _, deleted) = tally(&changes);
        assert_eq!(source.resource_count(), 5 + created - deleted);
        assert_eq!(source.change_memory().unwrap().window().1, 30);
    }

    #[test]
    fn resource_list_links_change_lists() {
        let dir = TempDir::new().unwrap();
        let config = small_config().with_static_dir(dir.path()).with_builders(vec![
            CapabilityBuilder::DynamicResourceList,
            CapabilityBuilder::DynamicChangeList { max_changes: None },
            CapabilityBuilder::StaticChangeList { max_changes: 1 },
        ]);
        let source = Source::new(config).unwrap();
        source.bootstrap();
        source.create(3);

        let set = source.resource_list();
        assert_eq!(set.len(), 6);
        let mut current = set.capabilities().hrefs_with_rel(rel::CURRENT);
        current.sort();
        assert_eq!(
            current,
            vec![
                "http://example.org/rs/changelist.xml",
                "http://example.org/rs/static/changelist00000.xml",
            ]
        );
    }
}
