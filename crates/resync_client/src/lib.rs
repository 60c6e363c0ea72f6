//! # resync client
//!
//! Keeps a local directory in step with a resync source.
//!
//! This crate provides:
//! - `ClientSyncEngine` for audit, baseline sync and incremental sync
//! - `ClientConfig` with URI to directory mappings
//! - `ResourceListBuilder`, which inventories the local replica
//! - The `Transport` trait with HTTP, loopback and mock implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              ClientSyncEngine                │
//! │  audit / sync / incremental_sync             │
//! └──────────────┬───────────────────┬───────────┘
//!                │                   │
//!      ┌─────────▼─────────┐ ┌───────▼──────────┐
//!      │ ResourceListBuilder│ │    Transport     │
//!      │  (local scan, md5) │ │ HTTP / loopback  │
//!      └────────────────────┘ └──────────────────┘
//! ```
//!
//! A baseline sync compares the remote inventory with a scan of the replica
//! and fetches what differs. An incremental sync follows the inventory's
//! `current` change list and replays it in order.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod apply;
mod config;
mod engine;
mod error;
mod http;
mod inventory;
mod report;
mod transport;

pub use apply::{ApplyOutcome, TransferFailure, APPLIED_TARGET};
pub use config::{ClientConfig, DEFAULT_SITEMAP_NAME};
pub use engine::{CancelHandle, ClientSyncEngine, IncrementalStep};
pub use error::{SyncError, SyncResult};
pub use http::{
    parse_http_date, HttpClient, HttpTransport, LoopbackClient, LoopbackServer, ReqwestClient,
};
pub use inventory::{compute_md5, ResourceListBuilder};
pub use report::{IncrementalReport, SyncMode, SyncReport};
pub use transport::{MockTransport, Response, Transport, TransportFetcher};
