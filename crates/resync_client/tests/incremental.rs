//! Incremental sync against an in-process source.

use resync_client::{
    ClientConfig, ClientSyncEngine, HttpTransport, IncrementalStep, LoopbackClient,
    LoopbackServer, Response, SyncError,
};
use resync_protocol::Mapper;
use resync_source::{CapabilityBuilder, Source, SourceConfig, SourceServer};
use resync_testkit::fixtures::{TempReplica, BASE_URI};
use std::sync::Arc;

/// Adapts the source server to the loopback client.
struct Served(SourceServer);

impl LoopbackServer for Served {
    fn handle_get(&self, url: &str) -> Result<Response, String> {
        let answer = self.0.handle_get(url);
        if !answer.is_success() {
            return Err(format!(
                "HTTP {}: {}",
                answer.status,
                String::from_utf8_lossy(&answer.body)
            ));
        }
        let mut response = Response::new(answer.body);
        response.last_modified = answer.last_modified;
        Ok(response)
    }
}

type Engine = ClientSyncEngine<HttpTransport<LoopbackClient<Served>>>;

fn source(max_changes: Option<usize>) -> Arc<Source> {
    let config = SourceConfig::new(BASE_URI)
        .with_resource_count(8)
        .with_average_payload(64)
        .with_seed(7)
        .with_builders(vec![
            CapabilityBuilder::DynamicResourceList,
            CapabilityBuilder::DynamicChangeList { max_changes },
        ]);
    let source = Arc::new(Source::new(config).unwrap());
    source.bootstrap();
    source
}

fn engine(source: &Arc<Source>, replica: &TempReplica) -> Engine {
    let config = ClientConfig::new(Mapper::single(BASE_URI, replica.path()).unwrap())
        .with_sitemap_name("resourcelist.xml");
    let server = Served(SourceServer::new(Arc::clone(source)));
    ClientSyncEngine::new(config, HttpTransport::new(LoopbackClient::new(server))).unwrap()
}

#[test]
fn baseline_then_incremental_converges() {
    let source = source(None);
    let replica = TempReplica::new();
    let engine = engine(&source, &replica);

    let baseline = engine.sync(true).unwrap();
    assert_eq!(baseline.created, 8);
    assert!(engine.audit().unwrap().in_sync());

    source.simulate(25);
    assert!(!engine.audit().unwrap().in_sync());

    let report = engine.incremental_sync(true, None).unwrap();
    assert_eq!(report.changelist, format!("{BASE_URI}/changelist.xml"));
    assert_eq!(report.changes, 25);
    assert_eq!(
        report.created + report.updated + report.deleted + report.superseded,
        25
    );
    assert_eq!(report.next.as_deref(), Some("http://example.org/rs/changelist.xml?from=26"));

    let audit = engine.audit().unwrap();
    assert!(audit.in_sync(), "{}", audit.status_line());
    assert_eq!(audit.same, source.resource_count());
}

#[test]
fn resume_from_next_link() {
    let source = source(None);
    let replica = TempReplica::new();
    let engine = engine(&source, &replica);
    engine.sync(true).unwrap();

    source.simulate(5);
    let first = engine.incremental_sync(true, None).unwrap();
    let next = first.next.unwrap();

    source.simulate(4);
    let second = engine.incremental_sync(true, Some(next.as_str())).unwrap();
    assert_eq!(second.changes, 4);
    assert_eq!(second.next.as_deref(), Some("http://example.org/rs/changelist.xml?from=10"));
    assert!(engine.audit().unwrap().in_sync());

    // Nothing new: an empty list that still points at the same resume point
    let third = engine.incremental_sync(true, Some(second.next.as_deref().unwrap())).unwrap();
    assert_eq!(third.changes, 0);
    assert_eq!(third.next, second.next);
}

#[test]
fn evicted_change_id_is_reported() {
    let source = source(Some(3));
    let replica = TempReplica::new();
    let engine = engine(&source, &replica);
    source.simulate(10);

    let err = engine
        .incremental_sync(true, Some("http://example.org/rs/changelist.xml?from=2"))
        .unwrap_err();
    match &err {
        SyncError::Incremental { step, source } => {
            assert_eq!(*step, IncrementalStep::FetchChangelist);
            assert!(matches!(**source, SyncError::DocumentFetch { .. }));
        }
        other => panic!("expected incremental failure, got {other:?}"),
    }
    assert!(err.to_string().starts_with("incremental sync failed at fetch changelist"));
}

#[test]
fn missing_current_link_fails_at_extraction() {
    let config = SourceConfig::new(BASE_URI)
        .with_resource_count(2)
        .with_builders(vec![CapabilityBuilder::DynamicResourceList]);
    let source = Arc::new(Source::new(config).unwrap());
    source.bootstrap();
    let replica = TempReplica::new();
    let engine = engine(&source, &replica);

    match engine.incremental_sync(false, None).unwrap_err() {
        SyncError::Incremental { step, source } => {
            assert_eq!(step, IncrementalStep::ExtractCurrentLink);
            assert!(matches!(*source, SyncError::MissingLink { .. }));
        }
        other => panic!("expected incremental failure, got {other:?}"),
    }
}

#[test]
fn deletions_wait_for_permission() {
    let source = source(None);
    let replica = TempReplica::new();
    let engine = engine(&source, &replica);
    engine.sync(true).unwrap();

    let victim = source.resource_list().uris().next().unwrap().to_string();
    let name = victim.rsplit('/').next().unwrap().to_string();
    source.delete(&name).unwrap();

    let report = engine.incremental_sync(false, None).unwrap();
    assert_eq!(report.deletions_skipped, 1);
    assert!(replica.exists(&format!("resources/{name}")));

    let report = engine.incremental_sync(true, None).unwrap();
    assert_eq!(report.deleted, 1);
    assert!(!replica.exists(&format!("resources/{name}")));
}
