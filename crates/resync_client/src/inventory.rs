//! Inventories of the local replica.

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use resync_protocol::{Mapper, Resource, ResourceSet};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::SyncResult;

/// Builds a [`ResourceSet`] from the directories named by a [`Mapper`].
///
/// Every regular file under each mapped directory becomes a resource whose
/// URI is the file's path mapped back through the mapper. Symlinks are not
/// followed and never listed. Excluded
/// directory names are skipped at any depth; excluded file names are
/// skipped everywhere.
#[derive(Debug, Clone)]
pub struct ResourceListBuilder {
    mapper: Mapper,
    checksum: bool,
    exclude_dirs: Vec<String>,
    exclude_files: Vec<String>,
}

impl ResourceListBuilder {
    /// Creates a builder over the mapped directories.
    pub fn new(mapper: Mapper) -> Self {
        Self {
            mapper,
            checksum: false,
            exclude_dirs: vec![".git".to_string(), "CVS".to_string()],
            exclude_files: Vec::new(),
        }
    }

    /// Computes MD5 checksums for every file.
    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.checksum = enabled;
        self
    }

    /// Replaces the excluded directory names.
    pub fn with_exclude_dirs(mut self, dirs: Vec<String>) -> Self {
        self.exclude_dirs = dirs;
        self
    }

    /// Skips files named `name`.
    pub fn exclude_file(mut self, name: impl Into<String>) -> Self {
        self.exclude_files.push(name.into());
        self
    }

    /// Scans the mapped directories.
    ///
    /// A mapped directory that does not exist yet contributes nothing.
    pub fn build(&self) -> SyncResult<ResourceSet> {
        let mut set = ResourceSet::new();
        for mapping in self.mapper.mappings() {
            let root = mapping.dst_path();
            if !root.is_dir() {
                debug!(path = %root.display(), "mapped directory missing, treating as empty");
                continue;
            }
            for path in self.files_under(root)? {
                let resource = self.describe(&path)?;
                if let Some(previous) = set.get(&resource.uri) {
                    warn!(uri = %previous.uri, path = %path.display(), "file reachable through two mappings");
                    continue;
                }
                set.add(resource)?;
            }
        }
        debug!(resources = set.len(), checksum = self.checksum, "built local inventory");
        Ok(set)
    }

    fn files_under(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                let file_type = entry.file_type()?;
                if file_type.is_symlink() {
                    debug!(path = %entry.path().display(), "skipping symlink");
                } else if file_type.is_dir() {
                    if !self.exclude_dirs.contains(&name) {
                        pending.push(entry.path());
                    }
                } else if file_type.is_file() && !self.exclude_files.contains(&name) {
                    files.push(entry.path());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn describe(&self, path: &Path) -> SyncResult<Resource> {
        let uri = self.mapper.dst_to_src(path)?;
        let meta = fs::metadata(path)?;
        let mut resource = Resource::new(uri)
            .with_last_modified(DateTime::<Utc>::from(meta.modified()?))
            .with_size(meta.len());
        if self.checksum {
            resource = resource.with_checksum(compute_md5(path)?);
        }
        Ok(resource)
    }
}

/// Returns the hex MD5 digest of the file at `path`.
pub fn compute_md5(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
