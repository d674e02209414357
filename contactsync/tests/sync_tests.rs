//! Requester and source talking over a mock transport.

mod common;

use common::{config, init_tracing, provider, sample_source, uid};
use contactsync::transport::mock::MockTransport;
use contactsync::vcard::extract_metadata;
use contactsync::{
    ContactCache, ContactsProvider, ContactsRequester, ContactsService, Dispatcher, Packet,
    PacketTransport, SyncError,
};
use contactsync_source::{ContactsAccess, ContactsSchema, MemoryRow, MemorySource, SqliteSource};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;

fn serve(provider: ContactsProvider) -> (MockTransport, tokio::task::JoinHandle<()>) {
    let (requester_end, source_end) = MockTransport::pair();
    let service = ContactsService::new(Dispatcher::new().with_handler(Arc::new(provider)));
    let handle = tokio::spawn(async move { service.run(Arc::new(source_end)).await });
    (requester_end, handle)
}

fn set(uids: &[&str]) -> BTreeSet<contactsync_types::Uid> {
    uids.iter().map(|u| uid(u)).collect()
}

// ── End to end ───────────────────────────────────────────────────

#[tokio::test]
async fn fetches_only_what_changed() {
    init_tracing();
    let (transport, _service) = serve(provider(sample_source()));

    let mut cache = ContactCache::new();
    cache.insert(uid("alice"), "cached alice", 100);
    let mut requester = ContactsRequester::new(cache);

    let report = requester.sync(&transport).await.unwrap();
    assert_eq!(report.fetched, set(&["bob"]));
    assert!(report.deleted.is_empty());
    assert!(report.missing.is_empty());

    let cache = requester.into_cache();
    assert_eq!(cache.get(&uid("alice")).unwrap().vcard, "cached alice");

    let bob = &cache.get(&uid("bob")).unwrap().vcard;
    assert_eq!(bob.matches("END:VCARD").count(), 1);
    let lines: Vec<&str> = bob.lines().collect();
    let n = lines.len();
    assert_eq!(lines[n - 1], "END:VCARD");
    assert_eq!(
        lines[n - 3],
        format!("X-KDECONNECT-ID-DEV-{}:bob", config().device_id)
    );
    assert_eq!(lines[n - 2], "X-KDECONNECT-TIMESTAMP:200");
    assert_eq!(cache.get(&uid("bob")).unwrap().timestamp, 200);
}

#[tokio::test]
async fn second_sync_is_a_no_op() {
    let (transport, _service) = serve(provider(sample_source()));
    let mut requester = ContactsRequester::default();

    let first = requester.sync(&transport).await.unwrap();
    assert_eq!(first.fetched, set(&["alice", "bob"]));

    let second = requester.sync(&transport).await.unwrap();
    assert!(second.fetched.is_empty());
    assert!(second.deleted.is_empty());
    assert_eq!(requester.cache().len(), 2);
}

#[tokio::test]
async fn contacts_gone_from_source_are_reported() {
    let schema = ContactsSchema::default();
    let source = Arc::new(sample_source());
    let provider = ContactsProvider::new(source.clone(), ContactsAccess::read_only(), config());
    let (transport, _service) = serve(provider);

    let mut requester = ContactsRequester::default();
    requester.sync(&transport).await.unwrap();

    let lookup = schema.lookup_column.clone();
    source
        .remove_where(&schema.table, |row| {
            row.get(&lookup).and_then(|v| v.as_text()) == Some("alice")
        })
        .unwrap();
    source
        .insert(
            &schema.table,
            MemoryRow::new()
                .text(&schema.lookup_column, "carol")
                .integer(&schema.timestamp_column, 300)
                .text(&schema.vcard_column, common::vcard("Carol")),
        )
        .unwrap();

    let report = requester.sync(&transport).await.unwrap();
    assert_eq!(report.deleted, set(&["alice"]));
    assert_eq!(report.fetched, set(&["carol"]));
    // Deletion is reported only.
    assert!(requester.cache().contains(&uid("alice")));
}

#[tokio::test]
async fn denied_source_leaves_request_unanswered() {
    let provider = ContactsProvider::new(
        Arc::new(sample_source()),
        ContactsAccess::none(),
        config(),
    );
    let (transport, _service) = serve(provider);

    let mut requester = ContactsRequester::default();
    let err = requester.sync(&transport).await.unwrap_err();
    assert!(matches!(err, SyncError::NoResponse(_)));
    assert_eq!(requester.state(), contactsync::RequesterState::Idle);
}

#[tokio::test]
async fn unknown_packet_type_gets_no_response() {
    let (transport, _service) = serve(provider(sample_source()));
    let err = transport
        .send_request(Packet::new("kdeconnect.contacts.request_all_uids"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NoResponse(_)));
}

#[tokio::test]
async fn service_stops_when_transport_closes() {
    let (transport, service) = serve(provider(sample_source()));
    drop(transport);
    service.await.unwrap();
}

#[tokio::test]
async fn concurrent_requests_are_each_answered() {
    let (transport, _service) = serve(provider(sample_source()));
    let transport = Arc::new(transport);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let transport = transport.clone();
        tasks.push(tokio::spawn(async move {
            let mut requester = ContactsRequester::default();
            requester.sync(transport.as_ref()).await
        }));
    }
    for task in tasks {
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.fetched, set(&["alice", "bob"]));
    }
}

// ── SQLite-backed source ─────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn syncs_from_sqlite_source() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = SqliteSource::open(dir.path().join("contacts.db")).unwrap();
    source
        .execute_batch(
            "CREATE TABLE contacts (
                 _id INTEGER PRIMARY KEY,
                 lookup TEXT,
                 contact_last_updated_timestamp INTEGER,
                 vcard TEXT
             );
             INSERT INTO contacts (lookup, contact_last_updated_timestamp, vcard)
                 VALUES ('alice', 100, 'BEGIN:VCARD' || char(10) || 'FN:Alice' || char(10) || 'END:VCARD' || char(10));
             INSERT INTO contacts (lookup, contact_last_updated_timestamp, vcard)
                 VALUES ('bad', 5, 'BEGIN:VCARD' || char(10) || 'FN:Bad' || char(10));
             INSERT INTO contacts (lookup, contact_last_updated_timestamp, vcard)
                 VALUES (NULL, 1, 'BEGIN:VCARD' || char(10) || 'END:VCARD');",
        )
        .unwrap();

    let provider = ContactsProvider::new(Arc::new(source), ContactsAccess::read_only(), config());
    let (transport, _service) = serve(provider);

    let mut requester = ContactsRequester::default();
    let report = requester.sync(&transport).await.unwrap();
    assert_eq!(report.fetched, set(&["alice"]));
    assert_eq!(report.missing, set(&["bad"]));

    let alice = extract_metadata(&requester.cache().get(&uid("alice")).unwrap().vcard).unwrap();
    assert_eq!(alice.last_modified, 100);
}

#[tokio::test]
async fn memory_source_without_table_is_not_answered() {
    let provider = ContactsProvider::new(
        Arc::new(MemorySource::new()),
        ContactsAccess::read_only(),
        config(),
    );
    let (transport, _service) = serve(provider);
    let err = ContactsRequester::default().sync(&transport).await.unwrap_err();
    assert!(matches!(err, SyncError::NoResponse(_)));
}
