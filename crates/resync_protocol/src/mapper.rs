//! Translation between source URIs and local paths.

use crate::error::{ProtocolError, ProtocolResult};
use std::path::{Component, Path, PathBuf};

/// One URI prefix paired with one local path prefix.
///
/// The URI prefix is stored without a trailing `/`, and a URI only matches
/// on a segment boundary: `http://e.org/a` covers `http://e.org/a/x` but not
/// `http://e.org/ab`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    src_uri: String,
    dst_path: PathBuf,
}

impl Mapping {
    /// Creates a mapping from a URI prefix to a path prefix.
    pub fn new(src_uri: impl Into<String>, dst_path: impl Into<PathBuf>) -> ProtocolResult<Self> {
        let src_uri = src_uri.into();
        let dst_path = dst_path.into();

        let trimmed = src_uri.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ProtocolError::InvalidMapping(format!(
                "empty source URI in mapping to {}",
                dst_path.display()
            )));
        }
        if dst_path.as_os_str().is_empty() {
            return Err(ProtocolError::InvalidMapping(format!(
                "empty destination path for {src_uri}"
            )));
        }

        Ok(Self {
            src_uri: trimmed.to_string(),
            dst_path,
        })
    }

    /// Returns the URI prefix.
    pub fn src_uri(&self) -> &str {
        &self.src_uri
    }

    /// Returns the path prefix.
    pub fn dst_path(&self) -> &Path {
        &self.dst_path
    }

    /// Maps a URI under this prefix to a local path.
    ///
    /// Returns `None` for URIs outside the prefix, for the bare prefix, and for
    /// any URI that would not map back to itself: empty segments (`a//b`), a
    /// trailing `/`, or `.`/`..` segments.
    pub fn src_to_dst(&self, uri: &str) -> Option<PathBuf> {
        let rest = uri.strip_prefix(&self.src_uri)?.strip_prefix('/')?;

        let mut path = self.dst_path.clone();
        for segment in rest.split('/') {
            if segment.is_empty() || segment == ".." || segment == "." {
                return None;
            }
            path.push(segment);
        }
        Some(path)
    }

    /// Maps a local path under this prefix back to its URI.
    pub fn dst_to_src(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.dst_path).ok()?;

        let mut uri = self.src_uri.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    uri.push('/');
                    uri.push_str(&part.to_string_lossy());
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(uri)
    }
}

/// An ordered list of mappings. The first mapping that matches wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapper {
    mappings: Vec<Mapping>,
}

impl Mapper {
    /// Creates a mapper from mappings.
    pub fn new(mappings: Vec<Mapping>) -> Self {
        Self { mappings }
    }

    /// Creates a mapper with a single mapping.
    pub fn single(src_uri: impl Into<String>, dst_path: impl Into<PathBuf>) -> ProtocolResult<Self> {
        Ok(Self::new(vec![Mapping::new(src_uri, dst_path)?]))
    }

    /// Builds a mapper from a flat `[uri, path, uri, path, …]` list.
    pub fn from_pairs<S: AsRef<str>>(args: &[S]) -> ProtocolResult<Self> {
        if args.len() % 2 != 0 {
            return Err(ProtocolError::InvalidMapping(
                "mappings must be given as URI and path pairs".into(),
            ));
        }
        let mappings = args
            .chunks(2)
            .map(|pair| Mapping::new(pair[0].as_ref(), pair[1].as_ref()))
            .collect::<ProtocolResult<Vec<_>>>()?;
        Ok(Self::new(mappings))
    }

    /// Returns the mappings.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Returns true if no mapping is defined.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Maps a URI to a local path.
    pub fn src_to_dst(&self, uri: &str) -> ProtocolResult<PathBuf> {
        self.mappings
            .iter()
            .find_map(|m| m.src_to_dst(uri))
            .ok_or_else(|| ProtocolError::NoMapping {
                target: uri.to_string(),
            })
    }

    /// Maps a local path to a URI.
    pub fn dst_to_src(&self, path: &Path) -> ProtocolResult<String> {
        self.mappings
            .iter()
            .find_map(|m| m.dst_to_src(path))
            .ok_or_else(|| ProtocolError::NoMapping {
                target: path.display().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn src_to_dst() {
        let m = Mapping::new("http://e.org/data/", "/tmp/replica").unwrap();

        assert_eq!(m.src_uri(), "http://e.org/data");
        assert_eq!(
            m.src_to_dst("http://e.org/data/a/b.txt"),
            Some(PathBuf::from("/tmp/replica/a/b.txt"))
        );
        assert_eq!(m.src_to_dst("http://e.org/data"), None);
        assert_eq!(m.src_to_dst("http://e.org/data/"), None);
        assert_eq!(m.src_to_dst("http://e.org/database/x"), None);
        assert_eq!(m.src_to_dst("http://other.org/data/x"), None);
        assert_eq!(m.src_to_dst("http://e.org/data/../etc/passwd"), None);
    }

    #[test]
    fn dst_to_src() {
        let m = Mapping::new("http://e.org/data", "/tmp/replica").unwrap();

        assert_eq!(
            m.dst_to_src(Path::new("/tmp/replica/a/b.txt")),
            Some("http://e.org/data/a/b.txt".to_string())
        );
        assert_eq!(m.dst_to_src(Path::new("/var/other")), None);
    }

    #[test]
    fn round_trip_is_identity() {
        let m = Mapping::new("http://e.org/data", "/tmp/replica").unwrap();

        for uri in ["http://e.org/data/x", "http://e.org/data/d1/d2/file.xml"] {
            let path = m.src_to_dst(uri).unwrap();
            assert_eq!(m.dst_to_src(&path).unwrap(), uri);
        }
    }

    #[test]
    fn uris_that_cannot_round_trip_have_no_path() {
        let m = Mapping::new("http://e.org/rs", "/tmp/replica").unwrap();

        assert_eq!(m.src_to_dst("http://e.org/rs/dir/"), None);
        assert_eq!(m.src_to_dst("http://e.org/rs/a//b"), None);
        assert_eq!(m.src_to_dst("http://e.org/rs//a"), None);
        assert_eq!(m.src_to_dst("http://e.org/rs/./a"), None);
        assert_eq!(
            m.src_to_dst("http://e.org/rs/a/b"),
            Some(PathBuf::from("/tmp/replica/a/b"))
        );
    }

    #[test]
    fn first_match_wins() {
        let mapper = Mapper::from_pairs(&["http://a.org", "/a", "http://b.org", "/b"]).unwrap();

        assert_eq!(mapper.src_to_dst("http://b.org/x").unwrap(), PathBuf::from("/b/x"));
        assert_eq!(mapper.dst_to_src(Path::new("/a/y")).unwrap(), "http://a.org/y");
        assert!(matches!(
            mapper.src_to_dst("http://c.org/x"),
            Err(ProtocolError::NoMapping { .. })
        ));
    }

    #[test]
    fn invalid_mappings() {
        assert!(Mapper::from_pairs(&["http://a.org"]).is_err());
        assert!(Mapping::new("/", "/tmp").is_err());
        assert!(Mapping::new("http://a.org", "").is_err());
    }
}
