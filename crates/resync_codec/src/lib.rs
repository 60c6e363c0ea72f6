//! # resync codec
//!
//! Sitemap XML dialect for inventories and change lists.
//!
//! Documents are sitemap `<urlset>` files with extension elements in the
//! `rs` namespace (`rs:size`, `rs:md5`, `rs:changetype`, `rs:changeid`) and
//! `atom:link` capability links at the root. Large inventories are written as
//! numbered child documents plus a `<sitemapindex>`.
//!
//! ## Usage
//!
//! ```no_run
//! use resync_codec::{LocalFetcher, Sitemap};
//! use resync_protocol::{Resource, ResourceSet};
//! use std::path::Path;
//!
//! let mut set = ResourceSet::new();
//! set.add(Resource::new("http://example.org/a").with_size(5)).unwrap();
//!
//! let sitemap = Sitemap::new().with_max_entries(1000);
//! sitemap.write(&set, Path::new("/tmp/sitemap.xml")).unwrap();
//!
//! let back = sitemap.read(&LocalFetcher, "/tmp/sitemap.xml").unwrap();
//! assert_eq!(back.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod fetch;
mod reader;
mod sitemap;
mod writer;

pub use document::{Document, DocumentKind, Entry, ATOM_NS, RS_NS, SITEMAP_NS};
pub use error::{CodecError, CodecResult};
pub use fetch::{is_local, local_path, Fetch, LocalFetcher};
pub use reader::parse_document;
pub use sitemap::{chunk_path, Sitemap, Written, DEFAULT_MAX_ENTRIES};
pub use writer::{index_to_xml, urlset_to_xml, WriteEntry};
