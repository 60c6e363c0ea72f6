//! Error types for the codec crate.

use resync_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while reading or writing documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The document could not be retrieved.
    #[error("failed to fetch {uri}: {message}")]
    Fetch {
        /// Document URI.
        uri: String,
        /// Description of the failure.
        message: String,
    },

    /// The document is not well-formed or has invalid values.
    #[error("malformed document {uri}: {message}")]
    Format {
        /// Document URI.
        uri: String,
        /// Description of the problem.
        message: String,
    },

    /// A sitemap index was found where a single document was expected.
    #[error("got sitemapindex when expecting sitemap: {uri}")]
    UnexpectedIndex {
        /// Document URI.
        uri: String,
    },

    /// An index was found while multi-file support is off.
    #[error("got sitemapindex from {uri} but support for sitemapindex is disabled")]
    IndexDisabled {
        /// Document URI.
        uri: String,
    },

    /// A single document was found where an index was expected.
    #[error("got sitemap when expecting sitemapindex: {uri}")]
    UnexpectedUrlSet {
        /// Document URI.
        uri: String,
    },

    /// An entry has no `<loc>` element.
    #[error("entry without <loc> in {uri}")]
    MissingLoc {
        /// Document URI.
        uri: String,
    },

    /// Writing would need several documents but multi-file output is off.
    #[error("{count} entries exceed the limit of {max} per document and multi-file output is disabled")]
    MultifileDisabled {
        /// Number of entries.
        count: usize,
        /// Entries allowed per document.
        max: usize,
    },

    /// Filesystem error while writing.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path being written or inspected.
        path: PathBuf,
        /// Description of the error.
        message: String,
    },

    /// Error from the protocol model.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl CodecError {
    /// Creates a format error for `uri`.
    pub fn format(uri: &str, message: impl std::fmt::Display) -> Self {
        Self::Format {
            uri: uri.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a fetch error for `uri`.
    pub fn fetch(uri: &str, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            uri: uri.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Returns true if the document could not be retrieved at all.
    pub fn is_fetch(&self) -> bool {
        matches!(self, CodecError::Fetch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CodecError::UnexpectedIndex {
            uri: "http://e.org/sitemap.xml".into(),
        };
        assert_eq!(
            err.to_string(),
            "got sitemapindex when expecting sitemap: http://e.org/sitemap.xml"
        );

        let err = CodecError::IndexDisabled {
            uri: "http://e.org/sitemap.xml".into(),
        };
        assert!(err.to_string().ends_with("support for sitemapindex is disabled"));

        let err = CodecError::MultifileDisabled { count: 7, max: 3 };
        assert!(err.to_string().contains("7 entries"));
    }

    #[test]
    fn classification() {
        assert!(CodecError::fetch("u", "refused").is_fetch());
        assert!(!CodecError::format("u", "bad").is_fetch());
    }
}
