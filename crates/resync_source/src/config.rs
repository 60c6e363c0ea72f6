//! Source configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{SourceError, SourceResult};

/// Publishing strategy, selected once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum CapabilityBuilder {
    /// Serves `/resourcelist.xml` from the in-memory repository.
    #[serde(rename = "DynamicResourceListBuilder", alias = "DynamicResourceList")]
    DynamicResourceList,

    /// Writes `resourcelist.xml` into the static directory on demand.
    #[serde(rename = "StaticResourceListBuilder", alias = "StaticResourceList")]
    StaticResourceList {
        /// Entries per document before the list is paginated.
        #[serde(default = "default_max_sitemap_entries")]
        max_sitemap_entries: usize,
    },

    /// Serves change windows from an in-memory change memory.
    DynamicChangeList {
        /// Changes retained; `None` keeps all of them.
        #[serde(default)]
        max_changes: Option<usize>,
    },

    /// Writes a numbered changelist file every `max_changes` changes.
    StaticChangeList {
        /// Changes per file.
        #[serde(default = "default_static_max_changes")]
        max_changes: usize,
    },
}

fn default_max_sitemap_entries() -> usize {
    resync_codec::DEFAULT_MAX_ENTRIES
}

fn default_static_max_changes() -> usize {
    100
}

impl CapabilityBuilder {
    /// Returns true if the builder writes into the static directory.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            CapabilityBuilder::StaticResourceList { .. } | CapabilityBuilder::StaticChangeList { .. }
        )
    }
}

/// Configuration for a simulated source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// URI prefix under which documents and resources are published.
    pub base_uri: String,
    /// Resources created by bootstrap.
    pub resource_count: usize,
    /// Average payload size in bytes.
    pub average_payload: u64,
    /// Changes simulated when no explicit count is given.
    pub max_events: usize,
    /// Random seed for bootstrap and simulation.
    pub seed: u64,
    /// Directory for static documents.
    pub static_dir: Option<PathBuf>,
    /// Capability builders.
    pub builders: Vec<CapabilityBuilder>,
}

impl SourceConfig {
    /// Creates a configuration publishing under `base_uri`.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            ..Self::default()
        }
    }

    /// Sets the number of bootstrap resources.
    pub fn with_resource_count(mut self, count: usize) -> Self {
        self.resource_count = count;
        self
    }

    /// Sets the average payload size.
    pub fn with_average_payload(mut self, bytes: u64) -> Self {
        self.average_payload = bytes;
        self
    }

    /// Sets the default number of simulated changes.
    pub fn with_max_events(mut self, events: usize) -> Self {
        self.max_events = events;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the static document directory.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Replaces the capability builders.
    pub fn with_builders(mut self, builders: Vec<CapabilityBuilder>) -> Self {
        self.builders = builders;
        self
    }

    /// Parses a JSON configuration.
    pub fn from_json(text: &str) -> SourceResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON configuration file.
    pub fn load(path: &Path) -> SourceResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> SourceResult<()> {
        let base = Url::parse(&self.base_uri)
            .map_err(|e| SourceError::Config(format!("base_uri {:?}: {e}", self.base_uri)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SourceError::Config(format!(
                "base_uri must be http or https, got {}",
                base.scheme()
            )));
        }
        if self.average_payload == 0 {
            return Err(SourceError::Config("average_payload must be positive".into()));
        }

        let mut dynamic_changes = 0;
        let mut static_changes = 0;
        for builder in &self.builders {
            match builder {
                CapabilityBuilder::StaticResourceList { max_sitemap_entries: 0 } => {
                    return Err(SourceError::Config("max_sitemap_entries must be positive".into()))
                }
                CapabilityBuilder::StaticChangeList { max_changes: 0 } => {
                    return Err(SourceError::Config("max_changes must be positive".into()))
                }
                CapabilityBuilder::DynamicChangeList { .. } => dynamic_changes += 1,
                CapabilityBuilder::StaticChangeList { .. } => static_changes += 1,
                _ => {}
            }
            if builder.is_static() && self.static_dir.is_none() {
                return Err(SourceError::Config(format!(
                    "{builder:?} needs a static_dir"
                )));
            }
        }
        if dynamic_changes > 1 || static_changes > 1 {
            return Err(SourceError::Config(
                "at most one changelist builder of each kind".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_uri: "http://localhost:8888".to_string(),
            resource_count: 1000,
            average_payload: 1000,
            max_events: 100,
            seed: 0,
            static_dir: None,
            builders: vec![
                CapabilityBuilder::DynamicResourceList,
                CapabilityBuilder::DynamicChangeList {
                    max_changes: Some(1000),
                },
            ],
        }
    }
}
