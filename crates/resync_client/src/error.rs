//! Error types for the sync client.

use resync_codec::CodecError;
use resync_protocol::ProtocolError;
use thiserror::Error;

use crate::engine::IncrementalStep;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during audit and synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The client is misconfigured; raised before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A sitemap or changelist could not be retrieved.
    #[error("failed to fetch document {uri}: {message}")]
    DocumentFetch {
        /// Document URI.
        uri: String,
        /// Description of the failure.
        message: String,
    },

    /// A sitemap or changelist is malformed or of the wrong kind.
    #[error("bad document {uri}: {message}")]
    DocumentFormat {
        /// Document URI.
        uri: String,
        /// Description of the problem.
        message: String,
    },

    /// A resource URI was listed twice.
    #[error("duplicate resource: {uri}")]
    DupeResource {
        /// Repeated URI.
        uri: String,
    },

    /// A resource lies outside the area the document may speak for.
    #[error("{document} has no authority over {resource}")]
    AuthorityViolation {
        /// Document that listed the resource.
        document: String,
        /// Offending resource URI.
        resource: String,
    },

    /// A single resource could not be fetched, written or deleted.
    #[error("transfer of {uri} failed: {message}")]
    ResourceTransfer {
        /// Resource URI.
        uri: String,
        /// Description of the failure.
        message: String,
    },

    /// The source no longer (or not yet) holds the requested change id.
    #[error("unknown change id {requested} (first {first}, latest {latest})")]
    UnknownChangeId {
        /// Change id asked for.
        requested: u64,
        /// Oldest change id the source retains.
        first: u64,
        /// Most recent change id.
        latest: u64,
    },

    /// The remote inventory lists no resources.
    #[error("remote inventory {uri} is empty, refusing to sync")]
    EmptyInventory {
        /// Inventory URI.
        uri: String,
    },

    /// A document lacks a required capability link.
    #[error("{document} has no {rel} link")]
    MissingLink {
        /// Document URI.
        document: String,
        /// Link relation looked for.
        rel: String,
    },

    /// A document carries several links where one is expected.
    #[error("{document} has {} {rel} links: {}", .hrefs.len(), .hrefs.join(", "))]
    AmbiguousLink {
        /// Document URI.
        document: String,
        /// Link relation looked for.
        rel: String,
        /// All candidate targets.
        hrefs: Vec<String>,
    },

    /// Local filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// An incremental run failed at `step`.
    #[error("incremental sync failed at {step}: {source}")]
    Incremental {
        /// Step that failed.
        step: IncrementalStep,
        /// Underlying error.
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Creates a per-resource transfer error.
    pub fn transfer(uri: &str, message: impl std::fmt::Display) -> Self {
        Self::ResourceTransfer {
            uri: uri.to_string(),
            message: message.to_string(),
        }
    }

    /// Wraps an error raised during an incremental step.
    pub fn incremental(step: IncrementalStep, source: SyncError) -> Self {
        Self::Incremental {
            step,
            source: Box::new(source),
        }
    }

    /// Returns true if the error can be logged and the run continued.
    ///
    /// Only per-resource transfer failures qualify; whether they are
    /// tolerated is decided by `ClientConfig::ignore_failures`.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::ResourceTransfer { .. } => true,
            SyncError::Incremental { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Returns true if the error always aborts the run.
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns true if the run ended because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        match self {
            SyncError::Cancelled => true,
            SyncError::Incremental { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl From<CodecError> for SyncError {
    fn from(err: CodecError) -> Self {
        let text = err.to_string();
        match err {
            CodecError::Fetch { uri, message } => SyncError::DocumentFetch { uri, message },
            CodecError::Format { uri, message } => SyncError::DocumentFormat { uri, message },
            CodecError::UnexpectedIndex { uri }
            | CodecError::IndexDisabled { uri }
            | CodecError::UnexpectedUrlSet { uri }
            | CodecError::MissingLoc { uri } => SyncError::DocumentFormat { uri, message: text },
            CodecError::Io { path, .. } => SyncError::DocumentFormat {
                uri: path.display().to_string(),
                message: text,
            },
            CodecError::MultifileDisabled { .. } => SyncError::Configuration(text),
            CodecError::Protocol(e) => e.into(),
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::DupeResource { uri } => SyncError::DupeResource { uri },
            ProtocolError::InvalidTimestamp { value } => SyncError::DocumentFormat {
                uri: String::new(),
                message: format!("invalid timestamp {value:?}"),
            },
            other @ (ProtocolError::NoMapping { .. } | ProtocolError::InvalidMapping(_)) => {
                SyncError::Configuration(other.to_string())
            }
        }
    }
}
