//! Reading and writing sitemap files on disk.

use proptest::prelude::*;
use resync_codec::{CodecError, LocalFetcher, Sitemap};
use resync_protocol::{
    rel, Capability, ChangeKind, ChangeList, ChangeRecord, Mapper, Resource, ResourceSet,
};
use resync_testkit::fixtures::{sample_set, t0, uri, BASE_URI};
use resync_testkit::generators::arb_resource_set;
use std::fs;
use tempfile::TempDir;

fn assert_same_resources(a: &ResourceSet, b: &ResourceSet) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!(x.near_eq(y), "{x:?} != {y:?}");
    }
}

fn numbered_set(count: usize) -> ResourceSet {
    (0..count)
        .map(|i| Resource::new(uri(&format!("r{i:04}"))).with_size(i as u64))
        .collect()
}

#[test]
fn single_document_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sitemap.xml");

    let mut set = sample_set(&[("a", 5), ("b", 3), ("c", 7)]);
    set.add_capability(
        format!("{BASE_URI}/changelist.xml"),
        Capability::new([rel::CURRENT]).with_type(resync_protocol::CHANGELIST_TYPE),
    );

    let sitemap = Sitemap::new();
    let written = sitemap.write(&set, &path).unwrap();
    assert!(!written.is_multifile());

    let back = sitemap.read(&LocalFetcher, path.to_str().unwrap()).unwrap();
    assert_same_resources(&set, &back);
    assert_eq!(back.capabilities(), set.capabilities());
}

#[test]
fn paginated_write_produces_index() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sitemap.xml");
    let mut set = numbered_set(25);
    set.add_capability("http://example.org/rs/changes", Capability::new([rel::CURRENT]));

    let sitemap = Sitemap::new().with_max_entries(10);
    let written = sitemap.write(&set, &path).unwrap();

    // ceil(25 / 10) children plus the index
    assert_eq!(written.documents.len(), 3);
    assert_eq!(written.index.as_deref(), Some(path.as_path()));
    for (n, doc) in written.documents.iter().enumerate() {
        let name = doc.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("sitemap{n:05}.xml"));
    }

    // Chunks carry no capabilities, the index does
    let index_xml = fs::read_to_string(&path).unwrap();
    assert!(index_xml.contains("<sitemapindex"));
    assert!(index_xml.contains("rel=\"current\""));
    let chunk_xml = fs::read_to_string(&written.documents[0]).unwrap();
    assert!(!chunk_xml.contains("atom:link"));

    let back = sitemap.read(&LocalFetcher, path.to_str().unwrap()).unwrap();
    assert_same_resources(&set, &back);
    assert_eq!(back.capabilities(), set.capabilities());
}

#[test]
fn index_children_resolve_through_mapper() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("resourcelist.xml");
    let mapper = Mapper::single(BASE_URI, dir.path()).unwrap();
    let set = numbered_set(5);

    let sitemap = Sitemap::new().with_max_entries(2).with_mapper(mapper);
    sitemap.write(&set, &path).unwrap();

    // The index publishes remote URIs for its children
    let index_xml = fs::read_to_string(&path).unwrap();
    assert!(index_xml.contains(&format!("<loc>{BASE_URI}/resourcelist00002.xml</loc>")));

    // Reading the local copy maps them back to files
    let back = sitemap.read(&LocalFetcher, path.to_str().unwrap()).unwrap();
    assert_eq!(back.len(), 5);
}

#[test]
fn expectation_errors() {
    let dir = TempDir::new().unwrap();
    let index_path = dir.path().join("index.xml");
    let single_path = dir.path().join("single.xml");

    let sitemap = Sitemap::new().with_max_entries(2);
    sitemap.write(&numbered_set(3), &index_path).unwrap();
    sitemap.write(&numbered_set(1), &single_path).unwrap();

    let index_uri = index_path.to_str().unwrap();
    let single_uri = single_path.to_str().unwrap();

    assert_eq!(
        sitemap.read_single(&LocalFetcher, index_uri).unwrap_err(),
        CodecError::UnexpectedIndex { uri: index_uri.to_string() }
    );
    assert_eq!(
        sitemap.read_index(&LocalFetcher, single_uri).unwrap_err(),
        CodecError::UnexpectedUrlSet { uri: single_uri.to_string() }
    );
    assert_eq!(sitemap.read_index(&LocalFetcher, index_uri).unwrap().entries.len(), 2);
}

#[test]
fn multifile_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let sitemap = Sitemap::new().with_max_entries(2).with_multifile(false);

    let err = sitemap
        .write(&numbered_set(3), &dir.path().join("sitemap.xml"))
        .unwrap_err();
    assert_eq!(err, CodecError::MultifileDisabled { count: 3, max: 2 });
}

#[test]
fn index_is_not_followed_when_multifile_is_disabled() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sitemap.xml");
    Sitemap::new().with_max_entries(2).write(&numbered_set(3), &path).unwrap();
    let index_uri = path.to_str().unwrap();

    let sitemap = Sitemap::new().with_multifile(false);
    assert_eq!(
        sitemap.read(&LocalFetcher, index_uri).unwrap_err(),
        CodecError::IndexDisabled { uri: index_uri.to_string() }
    );
    assert_eq!(
        sitemap.read_change_list(&LocalFetcher, index_uri).unwrap_err(),
        CodecError::IndexDisabled { uri: index_uri.to_string() }
    );

    // A single document is still read
    let single = dir.path().join("single.xml");
    Sitemap::new().write(&numbered_set(3), &single).unwrap();
    assert_eq!(sitemap.read(&LocalFetcher, single.to_str().unwrap()).unwrap().len(), 3);
}

#[test]
fn change_list_keeps_document_order_across_pages() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("changelist.xml");

    let mut list = ChangeList::new();
    for (id, (name, kind)) in [
        ("z", ChangeKind::Created),
        ("a", ChangeKind::Updated),
        ("z", ChangeKind::Deleted),
        ("m", ChangeKind::Created),
        ("a", ChangeKind::Deleted),
    ]
    .into_iter()
    .enumerate()
    {
        let resource = Resource::new(uri(name)).with_last_modified(t0());
        list.push(ChangeRecord::new(resource, kind, id as u64 + 1));
    }
    list.add_capability(format!("{BASE_URI}/changelist.xml?from=6"), Capability::new([rel::NEXT]));

    let sitemap = Sitemap::new().with_max_entries(2);
    assert_eq!(sitemap.write_change_list(&list, &path).unwrap().documents.len(), 3);

    let back = sitemap
        .read_change_list(&LocalFetcher, path.to_str().unwrap())
        .unwrap();
    assert_eq!(back.changes(), list.changes());
    assert_eq!(back.links(rel::NEXT), list.links(rel::NEXT));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn read_write_round_trip(set in arb_resource_set(30), max in 1usize..12) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sitemap.xml");
        let sitemap = Sitemap::new().with_max_entries(max);

        let written = sitemap.write(&set, &path).unwrap();
        let expected_docs = if set.len() <= max { 1 } else { set.len().div_ceil(max) };
        prop_assert_eq!(written.documents.len(), expected_docs);

        let back = sitemap.read(&LocalFetcher, path.to_str().unwrap()).unwrap();
        prop_assert_eq!(back.len(), set.len());
        for (x, y) in set.iter().zip(back.iter()) {
            prop_assert!(x.near_eq(y));
        }
    }
}
