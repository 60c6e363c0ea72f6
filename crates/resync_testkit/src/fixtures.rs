//! Test fixtures and replica helpers.
//!
//! Provides temporary replica directories and small inventories for
//! common sync scenarios.

use chrono::{DateTime, TimeZone, Utc};
use resync_protocol::{Resource, ResourceSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

/// Base URI used by fixtures.
pub const BASE_URI: &str = "http://example.org/rs";

/// A fixed timestamp every fixture starts from.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2013, 1, 2, 3, 4, 5)
        .single()
        .expect("valid fixture timestamp")
}

/// Returns the fixture URI for a relative name.
pub fn uri(name: &str) -> String {
    format!("{BASE_URI}/{name}")
}

/// Creates a resource under [`BASE_URI`] with a size and timestamp.
pub fn resource(name: &str, size: u64, ts: DateTime<Utc>) -> Resource {
    Resource::new(uri(name))
        .with_size(size)
        .with_last_modified(ts)
}

/// Builds a set of `(name, size)` resources, all stamped [`t0`].
pub fn sample_set(entries: &[(&str, u64)]) -> ResourceSet {
    entries
        .iter()
        .map(|(name, size)| resource(name, *size, t0()))
        .collect()
}

/// A replica directory with automatic cleanup.
pub struct TempReplica {
    dir: TempDir,
}

impl TempReplica {
    /// Creates an empty replica.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the replica root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the local path of a relative name.
    pub fn file_path(&self, name: &str) -> PathBuf {
        name.split('/').fold(self.path().to_path_buf(), |p, s| p.join(s))
    }

    /// Writes a file and sets its modification time.
    pub fn write_file(&self, name: &str, content: &[u8], mtime: DateTime<Utc>) -> PathBuf {
        let path = self.file_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write fixture file");
        fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_modified(SystemTime::from(mtime)))
            .expect("Failed to set fixture mtime");
        path
    }

    /// Returns true if the relative name exists.
    pub fn exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }

    /// Reads a file.
    pub fn read(&self, name: &str) -> Vec<u8> {
        fs::read(self.file_path(name)).expect("Failed to read fixture file")
    }

    /// Returns the modification time of a file.
    pub fn mtime(&self, name: &str) -> DateTime<Utc> {
        let modified = fs::metadata(self.file_path(name))
            .and_then(|m| m.modified())
            .expect("Failed to stat fixture file");
        DateTime::<Utc>::from(modified)
    }

    /// Lists relative file names, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect(self.path(), self.path(), &mut out);
        out.sort();
        out
    }
}

impl Default for TempReplica {
    fn default() -> Self {
        Self::new()
    }
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let entries = fs::read_dir(dir).expect("Failed to list fixture directory");
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            let parts: Vec<_> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(parts.join("/"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_files() {
        let replica = TempReplica::new();
        replica.write_file("b", b"bbb", t0());
        replica.write_file("d/a", b"a", t0());

        assert_eq!(replica.files(), vec!["b", "d/a"]);
        assert_eq!(replica.read("b"), b"bbb");
        assert_eq!(replica.mtime("d/a"), t0());
    }

    #[test]
    fn sample_set_uris() {
        let set = sample_set(&[("a", 5), ("b", 3)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&uri("a")).unwrap().size, Some(5));
    }
}
