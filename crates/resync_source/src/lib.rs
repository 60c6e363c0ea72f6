//! # resync source
//!
//! Publishing side of resync: a simulated resource repository, the change
//! memory it feeds, and an in-process server for its documents.
//!
//! This crate provides:
//! - `Source`, an in-memory repository with seeded random changes
//! - `EventBus` and the `OnResourceChanged` subscriber trait
//! - `ChangeMemory`, a bounded log of change records with consecutive ids
//! - Static resource list and change list writers
//! - `SourceServer`, which answers GET requests for documents and payloads
//!
//! # Architecture
//!
//! Capability builders are chosen once, from `SourceConfig::builders`.
//! Each change to the repository is published on the bus; the change memory
//! and the static change list are subscribers. The server reads from the
//! repository and the change memory, never from the bus.
//!
//! ```rust,ignore
//! use resync_source::{Source, SourceConfig, SourceServer};
//!
//! let source = Arc::new(Source::new(SourceConfig::new("http://localhost:8888"))?);
//! source.bootstrap();
//! source.simulate(10);
//!
//! let server = SourceServer::new(source);
//! let changes = server.handle_get("/changelist.xml?from=5");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod builders;
mod change_memory;
mod config;
mod error;
mod event_bus;
mod server;
mod source;

pub use builders::{
    changelist_file, static_uri, StaticChangeList, StaticResourceList, RESOURCELIST_FILE,
    STATIC_PATH,
};
pub use change_memory::{
    ChangeIdPosition, ChangeMemory, Retention, SharedChangeMemory, CHANGELIST_PATH,
};
pub use config::{CapabilityBuilder, SourceConfig};
pub use error::{SourceError, SourceResult};
pub use event_bus::{EventBus, LoggingSubscriber, OnResourceChanged, ResourceChange};
pub use server::{SourceResponse, SourceServer, RESOURCELIST_PATH};
pub use source::{tally, Source, RESOURCES_PATH};
