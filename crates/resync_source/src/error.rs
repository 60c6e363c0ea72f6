//! Error types for the source side.

use resync_codec::CodecError;
use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while publishing documents.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The requested change id is outside the retained window.
    #[error("unknown change id {requested} (first {first}, latest {latest})")]
    UnknownChangeId {
        /// Change id asked for.
        requested: u64,
        /// Oldest change id still retained.
        first: u64,
        /// Most recently issued change id.
        latest: u64,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Document serialization error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// No resource or document at the given path.
    #[error("not found: {path}")]
    NotFound {
        /// Requested path.
        path: String,
    },
}

impl SourceError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SourceError::UnknownChangeId { .. } | SourceError::NotFound { .. }
        )
    }

    /// Returns the HTTP status the document server answers with.
    pub fn status(&self) -> u16 {
        match self {
            SourceError::UnknownChangeId { .. } | SourceError::NotFound { .. } => 404,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        let unknown = SourceError::UnknownChangeId {
            requested: 3,
            first: 5,
            latest: 9,
        };
        assert!(unknown.is_client_error());
        assert_eq!(unknown.status(), 404);
        assert_eq!(
            unknown.to_string(),
            "unknown change id 3 (first 5, latest 9)"
        );

        let config = SourceError::Config("bad".into());
        assert!(!config.is_client_error());
        assert_eq!(config.status(), 500);
    }
}
