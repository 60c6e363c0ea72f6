//! # resync protocol
//!
//! Data model for sitemap-based resource synchronization.
//!
//! This crate provides:
//! - `Resource` and the near-equality used to decide what changed
//! - `ResourceSet` inventories with capability links
//! - `ChangeRecord` / `ChangeList` change collections
//! - `compare`, the merge-walk diff of two inventories
//! - `Mapper` for URI prefix to local path translation
//! - `UrlAuthority` for checking that a document may describe a resource
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod authority;
mod capability;
mod change;
mod diff;
mod error;
mod mapper;
mod resource;
mod resource_set;
pub mod timestamp;

pub use authority::UrlAuthority;
pub use capability::{rel, Capabilities, Capability, CHANGELIST_TYPE, RESOURCELIST_TYPE};
pub use change::{ChangeKind, ChangeList, ChangeRecord};
pub use diff::{compare, Diff};
pub use error::{ProtocolError, ProtocolResult};
pub use mapper::{Mapper, Mapping};
pub use resource::{Resource, TIMESTAMP_TOLERANCE_MICROS};
pub use resource_set::{AddOutcome, DupePolicy, ResourceSet};
