//! Client sync engine.

use resync_codec::{Document, Sitemap};
use resync_protocol::{
    compare, rel, ChangeKind, ChangeList, ChangeRecord, ResourceSet, UrlAuthority, CHANGELIST_TYPE,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::apply::{ApplyLog, Applier};
use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::inventory::ResourceListBuilder;
use crate::report::{IncrementalReport, SyncMode, SyncReport};
use crate::transport::{Transport, TransportFetcher};

/// Steps of an incremental run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementalStep {
    /// Reading the root inventory.
    DiscoverRoot,
    /// Choosing the change list from the root's `current` link.
    ExtractCurrentLink,
    /// Reading the change list.
    FetchChangelist,
    /// Applying its entries.
    ApplyChanges,
    /// Finished.
    Done,
}

impl fmt::Display for IncrementalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IncrementalStep::DiscoverRoot => "discover root",
            IncrementalStep::ExtractCurrentLink => "extract current link",
            IncrementalStep::FetchChangelist => "fetch changelist",
            IncrementalStep::ApplyChanges => "apply changes",
            IncrementalStep::Done => "done",
        })
    }
}

/// Cancels a running sync from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Asks the running sync to stop before its next fetch.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Comparison {
    inventory: String,
    diff: resync_protocol::Diff,
}

/// Keeps a local replica in step with a source.
///
/// # Example
///
/// ```no_run
/// use resync_client::{ClientConfig, ClientSyncEngine, HttpTransport, ReqwestClient};
/// use resync_protocol::Mapper;
/// use std::time::Duration;
///
/// let mapper = Mapper::single("http://example.org/rs", "/srv/replica").unwrap();
/// let config = ClientConfig::new(mapper).with_sitemap_name("resourcelist.xml");
/// let transport = HttpTransport::new(ReqwestClient::new(Duration::from_secs(30)).unwrap());
///
/// let engine = ClientSyncEngine::new(config, transport).unwrap();
/// let report = engine.sync(false).unwrap();
/// println!("{}", report.status_line());
/// ```
pub struct ClientSyncEngine<T: Transport> {
    config: ClientConfig,
    transport: T,
    sitemap: Sitemap,
    cancelled: Arc<AtomicBool>,
}

impl<T: Transport> ClientSyncEngine<T> {
    /// Creates an engine after validating `config`.
    pub fn new(config: ClientConfig, transport: T) -> SyncResult<Self> {
        config.validate()?;
        let sitemap = config.sitemap();
        Ok(Self {
            config,
            transport,
            sitemap,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Asks the running sync to stop before its next fetch.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns a handle that cancels runs of this engine.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    /// Clears a previous cancellation.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn fetcher(&self) -> TransportFetcher<'_, T> {
        TransportFetcher(&self.transport)
    }

    /// Reads one document without following an index.
    pub fn read_document(&self, uri: &str) -> SyncResult<Document> {
        Ok(self.sitemap.read_root(&self.fetcher(), uri)?)
    }

    /// Reads an inventory, following an index.
    pub fn read_inventory(&self, uri: &str) -> SyncResult<ResourceSet> {
        Ok(self.sitemap.read(&self.fetcher(), uri)?)
    }

    /// Reads a change list, following an index.
    pub fn read_change_list(&self, uri: &str) -> SyncResult<ChangeList> {
        Ok(self.sitemap.read_change_list(&self.fetcher(), uri)?)
    }

    /// Scans the replica.
    pub fn local_inventory(&self, checksum: bool) -> SyncResult<ResourceSet> {
        ResourceListBuilder::new(self.config.mappings.clone())
            .with_checksum(checksum)
            .with_exclude_dirs(self.config.exclude_dirs.clone())
            .exclude_file(self.config.sitemap_name.clone())
            .build()
    }

    fn compare_with_remote(&self) -> SyncResult<Comparison> {
        let inventory = self.config.sitemap_uri()?;
        let remote = self.read_inventory(&inventory)?;
        if remote.is_empty() {
            return Err(SyncError::EmptyInventory { uri: inventory });
        }
        info!(uri = %inventory, resources = remote.len(), "read remote inventory");

        let checksum = if self.config.checksum && !remote.has_checksums() {
            info!(uri = %inventory, "no checksums in remote inventory, checksum mode disabled");
            false
        } else {
            self.config.checksum
        };
        let local = self.local_inventory(checksum)?;
        let diff = compare(&local, &remote);
        Ok(Comparison { inventory, diff })
    }

    /// Compares the replica with the remote inventory without changing it.
    pub fn audit(&self) -> SyncResult<SyncReport> {
        let cmp = self.compare_with_remote()?;
        let report = SyncReport::from_diff(SyncMode::Audit, &cmp.inventory, &cmp.diff, self.config.dry_run);
        info!("{}", report.status_line());
        Ok(report)
    }

    /// Brings the replica in line with the remote inventory.
    ///
    /// Updates and creations are fetched concurrently; deletions follow once
    /// every transfer has finished and only happen with `allow_deletion`.
    pub fn sync(&self, allow_deletion: bool) -> SyncResult<SyncReport> {
        self.reset_cancel();
        let cmp = self.compare_with_remote()?;
        let mut report = SyncReport::from_diff(SyncMode::Sync, &cmp.inventory, &cmp.diff, self.config.dry_run);
        if cmp.diff.in_sync() {
            info!("{}", report.status_line());
            return Ok(report);
        }

        let authority = UrlAuthority::new(cmp.inventory.as_str());
        self.check_authority(
            &authority,
            cmp.diff
                .updated
                .iter()
                .chain(&cmp.diff.created)
                .chain(&cmp.diff.deleted)
                .map(|r| r.uri.as_str()),
        )?;

        let (transfers, deletions): (Vec<ChangeRecord>, Vec<ChangeRecord>) = cmp
            .diff
            .into_change_list(1)
            .into_iter()
            .partition(|c| c.kind != ChangeKind::Deleted);

        let applier = Applier::new(&self.transport, &self.config, &self.cancelled);
        let mut log = ApplyLog::new(self.config.ignore_failures);

        let results = applier.fetch_all(&transfers)?;
        for (record, result) in transfers.into_iter().zip(results) {
            log.absorb(record, result)?;
        }
        self.check_cancelled()?;

        for record in deletions {
            self.check_cancelled()?;
            let result = applier.delete(&record.resource, allow_deletion);
            log.absorb(record, result)?;
        }

        report.absorb_log(log);
        info!(
            applied = report.applied.len(),
            failures = report.failures.len(),
            "{}",
            report.status_line()
        );
        Ok(report)
    }

    /// Applies the changes published since the last baseline.
    ///
    /// The change list is `changelist_uri` if given, otherwise the single
    /// `current` change list linked from the remote inventory.
    pub fn incremental_sync(
        &self,
        allow_deletion: bool,
        changelist_uri: Option<&str>,
    ) -> SyncResult<IncrementalReport> {
        self.reset_cancel();

        let uri = match changelist_uri {
            Some(uri) => uri.to_string(),
            None => {
                let root_uri = self.config.sitemap_uri()?;
                let root = self
                    .read_document(&root_uri)
                    .map_err(|e| SyncError::incremental(IncrementalStep::DiscoverRoot, e))?;
                current_changelist(&root)
                    .map_err(|e| SyncError::incremental(IncrementalStep::ExtractCurrentLink, e))?
            }
        };
        debug!(step = %IncrementalStep::FetchChangelist, uri = %uri);

        let list = self
            .read_change_list(&uri)
            .and_then(|list| check_resume_point(&uri, list))
            .map_err(|e| SyncError::incremental(IncrementalStep::FetchChangelist, e))?;

        let report = self
            .apply_change_list(&uri, list, allow_deletion)
            .map_err(|e| SyncError::incremental(IncrementalStep::ApplyChanges, e))?;
        info!(step = %IncrementalStep::Done, next = ?report.next, "{}", report.status_line());
        Ok(report)
    }

    fn apply_change_list(
        &self,
        uri: &str,
        list: ChangeList,
        allow_deletion: bool,
    ) -> SyncResult<IncrementalReport> {
        let authority = UrlAuthority::new(uri);
        self.check_authority(&authority, list.iter().map(|c| c.uri()))?;

        let superseded = superseded(list.changes());
        let mut report = IncrementalReport {
            changelist: uri.to_string(),
            changes: list.len(),
            next: list.links(rel::NEXT).first().map(|s| s.to_string()),
            ..IncrementalReport::default()
        };

        let applier = Applier::new(&self.transport, &self.config, &self.cancelled);
        let mut log = ApplyLog::new(self.config.ignore_failures);
        for (record, skip) in list.into_iter().zip(superseded) {
            if skip {
                debug!(uri = %record.uri(), kind = %record.kind, "superseded by a later deletion");
                report.superseded += 1;
                continue;
            }
            self.check_cancelled()?;

            let kind = record.kind;
            let result = match kind {
                ChangeKind::Created | ChangeKind::Updated => applier.fetch(&record.resource),
                ChangeKind::Deleted => applier.delete(&record.resource, allow_deletion),
            };
            if log.absorb(record, result)? {
                match kind {
                    ChangeKind::Created => report.created += 1,
                    ChangeKind::Updated => report.updated += 1,
                    ChangeKind::Deleted => report.deleted += 1,
                }
            }
        }

        report.absorb_log(log);
        Ok(report)
    }

    fn check_authority<'u>(
        &self,
        authority: &UrlAuthority,
        uris: impl IntoIterator<Item = &'u str>,
    ) -> SyncResult<()> {
        for uri in uris {
            if authority.has_authority_over(uri) {
                continue;
            }
            if self.config.no_auth {
                warn!(document = %authority.document(), resource = %uri, "no authority, continuing (--noauth)");
            } else {
                return Err(SyncError::AuthorityViolation {
                    document: authority.document().to_string(),
                    resource: uri.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Returns the single change list linked as `current` from `root`.
///
/// Links typed as something other than a change list are ignored.
fn current_changelist(root: &Document) -> SyncResult<String> {
    let hrefs: Vec<String> = root
        .capabilities
        .iter()
        .filter(|(_, cap)| {
            cap.has_rel(rel::CURRENT) && cap.kind.as_deref().map_or(true, |k| k == CHANGELIST_TYPE)
        })
        .map(|(href, _)| href.to_string())
        .collect();
    match hrefs.as_slice() {
        [] => Err(SyncError::MissingLink {
            document: root.uri.clone(),
            rel: rel::CURRENT.to_string(),
        }),
        [only] => Ok(only.clone()),
        _ => Err(SyncError::AmbiguousLink {
            document: root.uri.clone(),
            rel: rel::CURRENT.to_string(),
            hrefs,
        }),
    }
}

/// Rejects a change list that does not start where it was asked to.
///
/// Only applies when `uri` carries `from=N` and the list holds numbered
/// changes.
fn check_resume_point(uri: &str, list: ChangeList) -> SyncResult<ChangeList> {
    let requested = uri
        .split_once('?')
        .and_then(|(_, query)| query.split('&').find_map(|p| p.strip_prefix("from=")))
        .and_then(|v| v.parse::<u64>().ok());
    let ids = (list.changes().first(), list.changes().last());
    if let (Some(requested), (Some(first), Some(last))) = (requested, ids) {
        if first.change_id != 0 && first.change_id != requested {
            return Err(SyncError::UnknownChangeId {
                requested,
                first: first.change_id,
                latest: last.change_id,
            });
        }
    }
    Ok(list)
}

/// Marks creations and updates whose resource is deleted later in the list.
fn superseded(changes: &[ChangeRecord]) -> Vec<bool> {
    let mut last_deletion: HashMap<&str, usize> = HashMap::new();
    for (i, change) in changes.iter().enumerate() {
        if change.kind == ChangeKind::Deleted {
            last_deletion.insert(change.uri(), i);
        }
    }
    changes
        .iter()
        .enumerate()
        .map(|(i, change)| {
            change.kind != ChangeKind::Deleted
                && last_deletion.get(change.uri()).is_some_and(|&d| d > i)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_codec::DocumentKind;
    use resync_protocol::{Capabilities, Capability, Resource};

    fn record(name: &str, kind: ChangeKind, id: u64) -> ChangeRecord {
        ChangeRecord::new(Resource::new(format!("http://e.org/{name}")), kind, id)
    }

    fn root(links: &[(&str, Capability)]) -> Document {
        let mut capabilities = Capabilities::new();
        for (href, cap) in links {
            capabilities.insert(*href, cap.clone());
        }
        Document {
            uri: "http://e.org/resourcelist.xml".into(),
            kind: DocumentKind::UrlSet,
            capabilities,
            entries: Vec::new(),
        }
    }

    #[test]
    fn supersession() {
        let changes = vec![
            record("a", ChangeKind::Created, 1),
            record("b", ChangeKind::Updated, 2),
            record("a", ChangeKind::Deleted, 3),
            record("a", ChangeKind::Created, 4),
            record("b", ChangeKind::Updated, 5),
        ];
        assert_eq!(superseded(&changes), vec![true, false, false, false, false]);
    }

    #[test]
    fn current_link_selection() {
        let current = Capability::new([rel::CURRENT]).with_type(CHANGELIST_TYPE);

        let one = root(&[
            ("http://e.org/changelist.xml", current.clone()),
            ("http://e.org/other.xml", Capability::new([rel::CURRENT]).with_type("text/plain")),
        ]);
        assert_eq!(current_changelist(&one).unwrap(), "http://e.org/changelist.xml");

        let none = root(&[]);
        assert!(matches!(current_changelist(&none), Err(SyncError::MissingLink { .. })));

        let two = root(&[
            ("http://e.org/c1.xml", current.clone()),
            ("http://e.org/c2.xml", current),
        ]);
        match current_changelist(&two) {
            Err(SyncError::AmbiguousLink { hrefs, .. }) => assert_eq!(hrefs.len(), 2),
            other => panic!("expected ambiguous link, got {other:?}"),
        }
    }

    #[test]
    fn resume_point_must_match() {
        let list = ChangeList::from_changes(vec![
            record("a", ChangeKind::Created, 7),
            record("b", ChangeKind::Created, 8),
        ]);
        assert!(check_resume_point("http://e.org/changelist.xml?from=7", list.clone()).is_ok());
        assert!(check_resume_point("http://e.org/changelist.xml", list.clone()).is_ok());
        match check_resume_point("http://e.org/changelist.xml?from=5", list) {
            Err(SyncError::UnknownChangeId {
                requested,
                first,
                latest,
            }) => assert_eq!((requested, first, latest), (5, 7, 8)),
            other => panic!("expected unknown change id, got {other:?}"),
        }
    }

    #[test]
    fn step_names() {
        assert_eq!(IncrementalStep::DiscoverRoot.to_string(), "discover root");
        assert_eq!(IncrementalStep::Done.to_string(), "done");
    }
}
