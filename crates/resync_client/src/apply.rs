//! Applying changes to the local replica.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use resync_protocol::{ChangeRecord, Resource};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::Transport;

/// Tracing target of the applied-change log.
pub const APPLIED_TARGET: &str = "resync::applied";

/// What happened to one change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The replica was modified.
    Applied,
    /// Dry run: the action was only logged.
    DryRun,
    /// The run was cancelled before this change.
    Cancelled,
    /// A deletion was not performed because deletion is off.
    DeletionSkipped,
}

/// A per-resource failure tolerated under `ignore_failures`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    /// Resource URI.
    pub uri: String,
    /// Error description.
    pub message: String,
}

/// Fetches, writes and deletes replica files.
pub(crate) struct Applier<'a, T: Transport> {
    transport: &'a T,
    config: &'a ClientConfig,
    cancelled: &'a AtomicBool,
}

impl<'a, T: Transport> Applier<'a, T> {
    pub(crate) fn new(transport: &'a T, config: &'a ClientConfig, cancelled: &'a AtomicBool) -> Self {
        Self {
            transport,
            config,
            cancelled,
        }
    }

    /// Brings the local copy of `resource` up to date.
    pub(crate) fn fetch(&self, resource: &Resource) -> SyncResult<ApplyOutcome> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Ok(ApplyOutcome::Cancelled);
        }
        let uri = resource.uri.as_str();
        let path = self
            .config
            .mappings
            .src_to_dst(uri)
            .map_err(|e| SyncError::transfer(uri, e))?;

        if self.config.dry_run {
            info!(uri = %uri, path = %path.display(), "dryrun: would GET");
            return Ok(ApplyOutcome::DryRun);
        }

        let response = self.transport.get(uri)?;
        if let Some(expected) = resource.size {
            if expected != response.body.len() as u64 {
                warn!(
                    uri = %uri,
                    expected,
                    actual = response.body.len(),
                    "downloaded size differs from inventory"
                );
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::transfer(uri, e))?;
        }
        fs::write(&path, &response.body).map_err(|e| SyncError::transfer(uri, e))?;
        if let Some(ts) = resource.last_modified.or(response.last_modified) {
            set_mtime(&path, ts).map_err(|e| SyncError::transfer(uri, e))?;
        }
        debug!(uri = %uri, path = %path.display(), bytes = response.body.len(), "fetched");
        Ok(ApplyOutcome::Applied)
    }

    /// Removes the local copy of `resource` if deletion is allowed.
    pub(crate) fn delete(&self, resource: &Resource, allow_deletion: bool) -> SyncResult<ApplyOutcome> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Ok(ApplyOutcome::Cancelled);
        }
        let uri = resource.uri.as_str();
        let path = self
            .config
            .mappings
            .src_to_dst(uri)
            .map_err(|e| SyncError::transfer(uri, e))?;

        if !allow_deletion {
            info!(uri = %uri, path = %path.display(), "nodelete: would delete (--delete to enable)");
            return Ok(ApplyOutcome::DeletionSkipped);
        }
        if self.config.dry_run {
            info!(uri = %uri, path = %path.display(), "dryrun: would delete");
            return Ok(ApplyOutcome::DryRun);
        }

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(uri = %uri, path = %path.display(), "already deleted");
            }
            Err(e) => return Err(SyncError::transfer(uri, e)),
        }
        debug!(uri = %uri, path = %path.display(), "deleted");
        Ok(ApplyOutcome::Applied)
    }

    /// Fetches every resource on a pool of `max_concurrency` threads.
    ///
    /// Results are returned in input order once all workers are done.
    pub(crate) fn fetch_all(&self, records: &[ChangeRecord]) -> SyncResult<Vec<SyncResult<ApplyOutcome>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_concurrency)
            .thread_name(|i| format!("resync-fetch-{i}"))
            .build()
            .map_err(|e| SyncError::Configuration(format!("cannot start transfer pool: {e}")))?;
        Ok(pool.install(|| {
            records
                .par_iter()
                .map(|record| self.fetch(&record.resource))
                .collect()
        }))
    }
}

fn set_mtime(path: &Path, ts: DateTime<Utc>) -> io::Result<()> {
    fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::from(ts))
}

/// Writes an applied change to the applied-change log.
pub(crate) fn log_applied(record: &ChangeRecord) {
    match serde_json::to_string(record) {
        Ok(json) => info!(target: APPLIED_TARGET, "{json}"),
        Err(e) => warn!(uri = %record.uri(), error = %e, "cannot serialize applied change"),
    }
}

/// Accumulates change outcomes for a report.
#[derive(Debug, Default)]
pub(crate) struct ApplyLog {
    ignore_failures: bool,
    pub(crate) applied: Vec<ChangeRecord>,
    pub(crate) failures: Vec<TransferFailure>,
    pub(crate) deletions_skipped: usize,
    pub(crate) cancelled: usize,
}

impl ApplyLog {
    pub(crate) fn new(ignore_failures: bool) -> Self {
        Self {
            ignore_failures,
            ..Self::default()
        }
    }

    /// Records the outcome of `record`.
    ///
    /// Returns true if the change was carried out (or would have been, in a
    /// dry run). Errors that end the run are passed through.
    pub(crate) fn absorb(&mut self, record: ChangeRecord, result: SyncResult<ApplyOutcome>) -> SyncResult<bool> {
        match result {
            Ok(ApplyOutcome::Applied) => {
                log_applied(&record);
                self.applied.push(record);
                Ok(true)
            }
            Ok(ApplyOutcome::DryRun) => Ok(true),
            Ok(ApplyOutcome::DeletionSkipped) => {
                self.deletions_skipped += 1;
                Ok(false)
            }
            Ok(ApplyOutcome::Cancelled) => {
                self.cancelled += 1;
                Ok(false)
            }
            Err(e) if self.ignore_failures && e.is_recoverable() => {
                warn!(uri = %record.uri(), error = %e, "transfer failed, continuing");
                self.failures.push(TransferFailure {
                    uri: record.uri().to_string(),
                    message: e.to_string(),
                });
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use resync_protocol::{ChangeKind, Mapper};
    use resync_testkit::fixtures::{resource, t0, TempReplica, BASE_URI};

    fn config(replica: &TempReplica) -> ClientConfig {
        ClientConfig::new(Mapper::single(BASE_URI, replica.path()).unwrap())
    }

    #[test]
    fn fetch_writes_file_and_mtime() {
        let replica = TempReplica::new();
        let config = config(&replica);
        let transport = MockTransport::new();
        let cancelled = AtomicBool::new(false);
        let r = resource("dir/a", 5, t0());
        transport.insert_resource(&r, "hello");

        let applier = Applier::new(&transport, &config, &cancelled);
        assert_eq!(applier.fetch(&r).unwrap(), ApplyOutcome::Applied);
        assert_eq!(replica.read("dir/a"), b"hello");
        assert_eq!(replica.mtime("dir/a"), t0());
    }

    #[test]
    fn dry_run_and_cancel_do_not_touch_replica() {
        let replica = TempReplica::new();
        let transport = MockTransport::new();
        let r = resource("a", 1, t0());

        let dry = config(&replica).with_dry_run(true);
        let cancelled = AtomicBool::new(false);
        let applier = Applier::new(&transport, &dry, &cancelled);
        assert_eq!(applier.fetch(&r).unwrap(), ApplyOutcome::DryRun);

        let live = config(&replica);
        let cancelled = AtomicBool::new(true);
        let applier = Applier::new(&transport, &live, &cancelled);
        assert_eq!(applier.fetch(&r).unwrap(), ApplyOutcome::Cancelled);

        assert!(transport.requests().is_empty());
        assert!(!replica.exists("a"));
    }

    #[test]
    fn deletion_is_gated() {
        let replica = TempReplica::new();
        replica.write_file("gone", b"x", t0());
        let config = config(&replica);
        let transport = MockTransport::new();
        let cancelled = AtomicBool::new(false);
        let applier = Applier::new(&transport, &config, &cancelled);
        let r = resource("gone", 1, t0());

        assert_eq!(applier.delete(&r, false).unwrap(), ApplyOutcome::DeletionSkipped);
        assert!(replica.exists("gone"));
        assert_eq!(applier.delete(&r, true).unwrap(), ApplyOutcome::Applied);
        assert!(!replica.exists("gone"));
        // Deleting twice is not an error
        assert_eq!(applier.delete(&r, true).unwrap(), ApplyOutcome::Applied);
    }

    #[test]
    fn log_tolerates_failures_only_when_asked() {
        let record = ChangeRecord::new(resource("a", 1, t0()), ChangeKind::Created, 1);
        let failure = || Err(SyncError::transfer("http://example.org/rs/a", "timed out"));

        let mut strict = ApplyLog::new(false);
        assert!(strict.absorb(record.clone(), failure()).is_err());

        let mut lenient = ApplyLog::new(true);
        assert!(!lenient.absorb(record.clone(), failure()).unwrap());
        assert_eq!(lenient.failures.len(), 1);
        assert_eq!(lenient.failures[0].uri, "http://example.org/rs/a");

        // Configuration errors are never tolerated
        let fatal = Err(SyncError::Configuration("bad".into()));
        assert!(lenient.absorb(record.clone(), fatal).is_err());

        assert!(lenient.absorb(record, Ok(ApplyOutcome::Applied)).unwrap());
        assert_eq!(lenient.applied.len(), 1);
    }
}
