//! Error types for the protocol model.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building or translating protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A resource with the same URI is already in the set.
    #[error("duplicate resource: {uri}")]
    DupeResource {
        /// URI that was added twice.
        uri: String,
    },

    /// A timestamp could not be parsed.
    #[error("invalid timestamp: {value:?}")]
    InvalidTimestamp {
        /// Offending text.
        value: String,
    },

    /// No mapping covers the given URI or path.
    #[error("no mapping for {target}")]
    NoMapping {
        /// URI or path that was looked up.
        target: String,
    },

    /// A mapping definition is unusable.
    #[error("invalid mapping: {0}")]
    InvalidMapping(String),
}

impl ProtocolError {
    /// Returns true if the caller can log this and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProtocolError::DupeResource { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors() {
        assert!(ProtocolError::DupeResource { uri: "a".into() }.is_recoverable());
        assert!(!ProtocolError::InvalidMapping("empty".into()).is_recoverable());
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::NoMapping {
            target: "http://example.org/x".into(),
        };
        assert_eq!(err.to_string(), "no mapping for http://example.org/x");
    }
}
