//! Results of audit and sync runs.

use resync_protocol::{ChangeRecord, Diff};

use crate::apply::{ApplyLog, TransferFailure};

/// Kind of baseline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Comparison only.
    Audit,
    /// Comparison followed by transfers.
    Sync,
}

/// Outcome of an audit or a baseline sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Kind of run.
    pub mode: SyncMode,
    /// Inventory the replica was compared against.
    pub inventory: String,
    /// Resources already near-equal.
    pub same: usize,
    /// Resources that differ.
    pub updated: usize,
    /// Resources only in the replica.
    pub deleted: usize,
    /// Resources only at the source.
    pub created: usize,
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// Changes actually applied, in application order.
    pub applied: Vec<ChangeRecord>,
    /// Tolerated per-resource failures.
    pub failures: Vec<TransferFailure>,
    /// Deletions left undone because deletion was off.
    pub deletions_skipped: usize,
}

impl SyncReport {
    pub(crate) fn from_diff(mode: SyncMode, inventory: &str, diff: &Diff, dry_run: bool) -> Self {
        Self {
            mode,
            inventory: inventory.to_string(),
            same: diff.same,
            updated: diff.updated.len(),
            deleted: diff.deleted.len(),
            created: diff.created.len(),
            dry_run,
            applied: Vec::new(),
            failures: Vec::new(),
            deletions_skipped: 0,
        }
    }

    pub(crate) fn absorb_log(&mut self, log: ApplyLog) {
        self.applied = log.applied;
        self.failures = log.failures;
        self.deletions_skipped = log.deletions_skipped;
    }

    /// Number of resources that differed when the run started.
    pub fn differences(&self) -> usize {
        self.updated + self.deleted + self.created
    }

    /// Returns true if the replica matches the inventory after the run.
    pub fn in_sync(&self) -> bool {
        if self.differences() == 0 {
            return true;
        }
        self.mode == SyncMode::Sync
            && !self.dry_run
            && self.failures.is_empty()
            && self.deletions_skipped == 0
    }

    /// One-line summary, e.g.
    /// `Status: NOT IN SYNC (same=3, updated=1, deleted=0, created=2)`.
    pub fn status_line(&self) -> String {
        format!(
            "Status: {} (same={}, updated={}, deleted={}, created={})",
            if self.in_sync() { "IN SYNC" } else { "NOT IN SYNC" },
            self.same,
            self.updated,
            self.deleted,
            self.created
        )
    }
}

/// Outcome of an incremental sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncrementalReport {
    /// Change list that was applied.
    pub changelist: String,
    /// Entries in the change list.
    pub changes: usize,
    /// Creations carried out.
    pub created: usize,
    /// Updates carried out.
    pub updated: usize,
    /// Deletions carried out.
    pub deleted: usize,
    /// Entries skipped because a later entry deletes the same resource.
    pub superseded: usize,
    /// Changes actually applied, in document order.
    pub applied: Vec<ChangeRecord>,
    /// Tolerated per-resource failures.
    pub failures: Vec<TransferFailure>,
    /// Deletions left undone because deletion was off.
    pub deletions_skipped: usize,
    /// Where to resume: the change list's `next` link.
    pub next: Option<String>,
}

impl IncrementalReport {
    pub(crate) fn absorb_log(&mut self, log: ApplyLog) {
        self.applied = log.applied;
        self.failures = log.failures;
        self.deletions_skipped = log.deletions_skipped;
    }

    /// One-line summary of the run.
    pub fn status_line(&self) -> String {
        format!(
            "Status: {} (changes={}, created={}, updated={}, deleted={}, superseded={})",
            if self.failures.is_empty() && self.deletions_skipped == 0 {
                "CHANGES APPLIED"
            } else {
                "CHANGES PARTLY APPLIED"
            },
            self.changes,
            self.created,
            self.updated,
            self.deleted,
            self.superseded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_protocol::Resource;

    fn diff(same: usize, updated: usize, created: usize) -> Diff {
        Diff {
            same,
            updated: (0..updated).map(|i| Resource::new(format!("u{i}"))).collect(),
            deleted: Vec::new(),
            created: (0..created).map(|i| Resource::new(format!("c{i}"))).collect(),
        }
    }

    #[test]
    fn audit_status_line() {
        let report = SyncReport::from_diff(SyncMode::Audit, "s.xml", &diff(3, 1, 2), false);
        assert!(!report.in_sync());
        assert_eq!(
            report.status_line(),
            "Status: NOT IN SYNC (same=3, updated=1, deleted=0, created=2)"
        );

        let clean = SyncReport::from_diff(SyncMode::Audit, "s.xml", &diff(4, 0, 0), false);
        assert_eq!(
            clean.status_line(),
            "Status: IN SYNC (same=4, updated=0, deleted=0, created=0)"
        );
    }

    #[test]
    fn sync_is_in_sync_unless_something_was_left() {
        let mut report = SyncReport::from_diff(SyncMode::Sync, "s.xml", &diff(0, 1, 1), false);
        assert!(report.in_sync());

        report.deletions_skipped = 1;
        assert!(!report.in_sync());

        let dry = SyncReport::from_diff(SyncMode::Sync, "s.xml", &diff(0, 1, 1), true);
        assert!(!dry.in_sync());
    }
}
