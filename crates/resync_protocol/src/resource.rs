//! Synchronizable resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps closer than this many microseconds are the same modification.
pub const TIMESTAMP_TOLERANCE_MICROS: i64 = 1_000_000;

/// One synchronizable item.
///
/// `Resource` identifies an item by URI and optionally describes it with a
/// modification time, a byte size and a content checksum (MD5 hex).
///
/// # Near-equality
///
/// Two resources describe the same content when all of these hold:
/// - the URIs are identical
/// - both timestamps are unset, or both are set and differ by less than
///   one second ([`TIMESTAMP_TOLERANCE_MICROS`])
/// - the sizes match, if both are set
/// - the checksums match, if both are set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource URI, the key within a set.
    pub uri: String,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Content checksum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl Resource {
    /// Creates a resource with only a URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            last_modified: None,
            size: None,
            checksum: None,
        }
    }

    /// Sets the modification time.
    pub fn with_last_modified(mut self, ts: DateTime<Utc>) -> Self {
        self.last_modified = Some(ts);
        self
    }

    /// Sets the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the checksum.
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Returns the last path segment of the URI.
    pub fn basename(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or(&self.uri)
    }

    /// Returns true if `other` describes the same content.
    pub fn near_eq(&self, other: &Resource) -> bool {
        if self.uri != other.uri {
            return false;
        }

        let timestamps_match = match (self.last_modified, other.last_modified) {
            (None, None) => true,
            (Some(a), Some(b)) => (a - b)
                .num_microseconds()
                .is_some_and(|delta| delta.abs() < TIMESTAMP_TOLERANCE_MICROS),
            _ => false,
        };
        if !timestamps_match {
            return false;
        }

        if let (Some(a), Some(b)) = (self.size, other.size) {
            if a != b {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (&self.checksum, &other.checksum) {
            if a != b {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn basename() {
        assert_eq!(Resource::new("http://example.org/dir/file.txt").basename(), "file.txt");
        assert_eq!(Resource::new("plain").basename(), "plain");
    }

    #[test]
    fn near_eq_timestamp_tolerance() {
        let a = Resource::new("a").with_last_modified(t0());
        let close = Resource::new("a").with_last_modified(t0() + Duration::milliseconds(900));
        let far = Resource::new("a").with_last_modified(t0() + Duration::milliseconds(1100));

        assert!(a.near_eq(&close));
        assert!(close.near_eq(&a));
        assert!(!a.near_eq(&far));
        assert!(!far.near_eq(&a));
    }

    #[test]
    fn near_eq_one_sided_timestamp() {
        let stamped = Resource::new("a").with_last_modified(t0());
        let bare = Resource::new("a");

        assert!(!stamped.near_eq(&bare));
        assert!(!bare.near_eq(&stamped));
        assert!(bare.near_eq(&Resource::new("a")));
    }

    #[test]
    fn near_eq_size_and_checksum() {
        let a = Resource::new("a").with_size(5).with_checksum("abc");

        assert!(a.near_eq(&Resource::new("a").with_size(5)));
        assert!(a.near_eq(&Resource::new("a").with_checksum("abc")));
        assert!(!a.near_eq(&Resource::new("a").with_size(6)));
        assert!(!a.near_eq(&Resource::new("a").with_checksum("abd")));
        assert!(!a.near_eq(&Resource::new("b").with_size(5)));
    }

    #[test]
    fn serde_skips_unset_fields() {
        let json = serde_json::to_string(&Resource::new("a").with_size(3)).unwrap();
        assert_eq!(json, r#"{"uri":"a","size":3}"#);
    }
}
