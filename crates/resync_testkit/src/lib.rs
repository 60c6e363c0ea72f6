//! # resync testkit
//!
//! Test utilities for resync.
//!
//! This crate provides:
//! - Temporary replica directories with controlled file times
//! - Resource and inventory fixtures
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resync_testkit::prelude::*;
//!
//! #[test]
//! fn audit_sees_new_file() {
//!     let replica = TempReplica::new();
//!     replica.write_file("a", b"hello", t0());
//!     // ... build inventory from replica.path()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
