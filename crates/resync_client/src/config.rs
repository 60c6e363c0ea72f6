//! Client configuration.

use resync_codec::{Sitemap, DEFAULT_MAX_ENTRIES};
use resync_protocol::{DupePolicy, Mapper, Mapping};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{SyncError, SyncResult};

/// Default inventory document name.
pub const DEFAULT_SITEMAP_NAME: &str = "sitemap.xml";

/// Configuration for a sync client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Source URI prefixes and the local directories they map to.
    pub mappings: Mapper,
    /// Inventory document name, relative to the first mapping.
    pub sitemap_name: String,
    /// Compare MD5 checksums when the remote publishes them.
    pub checksum: bool,
    /// Log intended actions without transferring or deleting anything.
    pub dry_run: bool,
    /// Downgrade authority violations to warnings.
    pub no_auth: bool,
    /// Record per-resource failures instead of aborting.
    pub ignore_failures: bool,
    /// Accept and produce paginated documents.
    pub allow_multifile: bool,
    /// Entries per written document.
    pub max_entries: usize,
    /// Worker threads for transfers.
    pub max_concurrency: usize,
    /// Timeout for each GET.
    pub timeout: Duration,
    /// Directory names skipped when scanning the replica.
    pub exclude_dirs: Vec<String>,
}

impl ClientConfig {
    /// Creates a configuration with the given mappings.
    pub fn new(mappings: Mapper) -> Self {
        Self {
            mappings,
            sitemap_name: DEFAULT_SITEMAP_NAME.to_string(),
            checksum: false,
            dry_run: false,
            no_auth: false,
            ignore_failures: false,
            allow_multifile: true,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_concurrency: 4,
            timeout: Duration::from_secs(30),
            exclude_dirs: vec![".git".to_string(), "CVS".to_string()],
        }
    }

    /// Adds a mapping.
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        let mut mappings = self.mappings.mappings().to_vec();
        mappings.push(mapping);
        self.mappings = Mapper::new(mappings);
        self
    }

    /// Sets the inventory document name.
    pub fn with_sitemap_name(mut self, name: impl Into<String>) -> Self {
        self.sitemap_name = name.into();
        self
    }

    /// Enables checksum comparison.
    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.checksum = enabled;
        self
    }

    /// Enables dry-run mode.
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Disables authority enforcement.
    pub fn with_no_auth(mut self, enabled: bool) -> Self {
        self.no_auth = enabled;
        self
    }

    /// Tolerates per-resource failures.
    pub fn with_ignore_failures(mut self, enabled: bool) -> Self {
        self.ignore_failures = enabled;
        self
    }

    /// Allows or forbids paginated documents.
    pub fn with_multifile(mut self, allow: bool) -> Self {
        self.allow_multifile = allow;
        self
    }

    /// Sets the entries per written document.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Sets the number of transfer threads.
    pub fn with_max_concurrency(mut self, threads: usize) -> Self {
        self.max_concurrency = threads;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the excluded directory names.
    pub fn with_exclude_dirs(mut self, dirs: Vec<String>) -> Self {
        self.exclude_dirs = dirs;
        self
    }

    /// Checks the configuration before any I/O.
    pub fn validate(&self) -> SyncResult<()> {
        if self.mappings.is_empty() {
            return Err(SyncError::Configuration(
                "no source to destination mapping specified".into(),
            ));
        }
        if self.sitemap_name.is_empty() || self.sitemap_name.contains('/') {
            return Err(SyncError::Configuration(format!(
                "invalid sitemap name {:?}",
                self.sitemap_name
            )));
        }
        if self.max_concurrency == 0 {
            return Err(SyncError::Configuration("max_concurrency must be positive".into()));
        }
        if self.max_entries == 0 {
            return Err(SyncError::Configuration("max_entries must be positive".into()));
        }
        if self.timeout.is_zero() {
            return Err(SyncError::Configuration("timeout must be positive".into()));
        }
        Ok(())
    }

    /// URI of the remote inventory: the sitemap name under the first mapping.
    pub fn sitemap_uri(&self) -> SyncResult<String> {
        let first = self.first_mapping()?;
        Ok(format!("{}/{}", first.src_uri(), self.sitemap_name))
    }

    /// Local path of the inventory document.
    pub fn sitemap_path(&self) -> SyncResult<PathBuf> {
        Ok(self.first_mapping()?.dst_path().join(&self.sitemap_name))
    }

    /// Builds the document codec for these settings.
    pub fn sitemap(&self) -> Sitemap {
        Sitemap::new()
            .with_max_entries(self.max_entries)
            .with_multifile(self.allow_multifile)
            .with_dupe_policy(DupePolicy::Replace)
            .with_mapper(self.mappings.clone())
    }

    fn first_mapping(&self) -> SyncResult<&Mapping> {
        self.mappings
            .mappings()
            .first()
            .ok_or_else(|| SyncError::Configuration("no source to destination mapping specified".into()))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Mapper::default())
    }
}
