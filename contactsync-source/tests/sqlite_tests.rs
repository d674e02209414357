mod common;

use common::init_tracing;
use contactsync_source::{
    ContactsAccess, ContactsSchema, Projection, Query, Selection, SourceError, SqliteSource,
    TabularSource,
};
use contactsync_types::{ColumnType, ColumnValue, Uid};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::ops::ControlFlow;

fn uid(s: &str) -> Uid {
    Uid::parse(s).unwrap()
}

fn contacts_db() -> SqliteSource {
    let source = SqliteSource::open_in_memory().unwrap();
    source
        .execute_batch(
            "
            CREATE TABLE contacts (
                _id INTEGER PRIMARY KEY,
                lookup TEXT,
                contact_last_updated_timestamp INTEGER,
                vcard TEXT,
                photo BLOB,
                affinity REAL
            );
            INSERT INTO contacts (lookup, contact_last_updated_timestamp, vcard, photo, affinity)
                VALUES ('alice', 100, 'BEGIN:VCARD\nFN:Alice\nEND:VCARD\n', X'0102', 0.25);
            INSERT INTO contacts (lookup, contact_last_updated_timestamp, vcard, photo, affinity)
                VALUES ('bob', 150, 'BEGIN:VCARD\nFN:Bob\nEND:VCARD\n', NULL, NULL);
            INSERT INTO contacts (lookup, contact_last_updated_timestamp, vcard, photo, affinity)
                VALUES ('bob', 200, 'BEGIN:VCARD\nFN:Robert\nEND:VCARD\n', NULL, NULL);
            INSERT INTO contacts (lookup, contact_last_updated_timestamp, vcard, photo, affinity)
                VALUES (NULL, 999, 'BEGIN:VCARD\nFN:Ghost\nEND:VCARD\n', NULL, NULL);
            ",
        )
        .unwrap();
    source
}

// ── Raw scans ────────────────────────────────────────────────────

#[test]
fn scan_reports_storage_classes_as_type_tags() {
    let source = contacts_db();
    let query = Query::new(
        "contacts",
        vec![
            "lookup".into(),
            "contact_last_updated_timestamp".into(),
            "photo".into(),
            "affinity".into(),
        ],
    );
    let mut tags = Vec::new();
    source
        .scan(&query, &mut |row| {
            tags.push((
                row.column_type("lookup"),
                row.column_type("contact_last_updated_timestamp"),
                row.column_type("photo"),
                row.column_type("affinity"),
            ));
            ControlFlow::Break(())
        })
        .unwrap();
    assert_eq!(
        tags,
        vec![(
            Some(ColumnType::Text),
            Some(ColumnType::Integer),
            Some(ColumnType::Blob),
            Some(ColumnType::Float),
        )]
    );
}

#[test]
fn scan_get_typed_mismatch_is_absent() {
    let source = contacts_db();
    let query = Query::new("contacts", vec!["lookup".into()]);
    let mut value = None;
    source
        .scan(&query, &mut |row| {
            value = Some(row.get_typed("lookup", ColumnType::Integer));
            ControlFlow::Break(())
        })
        .unwrap();
    assert_eq!(value, Some(ColumnValue::Absent));
}

#[test]
fn scan_leaves_out_columns_the_table_lacks() {
    init_tracing();
    let source = contacts_db();
    let query = Query::new("contacts", vec!["lookup".into(), "nickname".into()]);
    let mut rows = 0;
    source
        .scan(&query, &mut |row| {
            assert_eq!(row.column_type("nickname"), None);
            rows += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(rows, 4);
}

#[test]
fn scan_with_no_known_columns_still_visits_rows() {
    let source = contacts_db();
    let query = Query::new("contacts", vec!["nickname".into()]);
    let mut rows = 0;
    source
        .scan(&query, &mut |_| {
            rows += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(rows, 4);
}

#[test]
fn scan_selection_is_pushed_down() {
    let source = contacts_db();
    let query = Query::new("contacts", vec!["lookup".into()])
        .with_selection(Selection::any_of("lookup", vec!["bob".into()]));
    let mut rows = 0;
    source
        .scan(&query, &mut |_| {
            rows += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(rows, 2);
}

#[test]
fn scan_selection_matches_integer_keys_as_text() {
    let source = contacts_db();
    let query = Query::new("contacts", vec!["lookup".into()])
        .with_selection(Selection::any_of("_id", vec!["1".into()]));
    let mut rows = 0;
    source
        .scan(&query, &mut |_| {
            rows += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn scan_unknown_table_is_error() {
    let source = contacts_db();
    let query = Query::new("nope", vec!["lookup".into()]);
    let result = source.scan(&query, &mut |_| ControlFlow::Continue(()));
    assert!(matches!(result, Err(SourceError::Query(_))));
}

// ── Projection over SQLite ───────────────────────────────────────

#[test]
fn manifest_over_sqlite_skips_null_lookup_and_takes_max() {
    init_tracing();
    let source = contacts_db();
    let schema = ContactsSchema::default();
    let access = ContactsAccess::read_only();
    let projection = Projection::new(&source, &access, &schema).unwrap();

    let manifest = projection.manifest(None).unwrap();
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.get(&uid("alice")), Some(100));
    assert_eq!(manifest.get(&uid("bob")), Some(200));
}

#[test]
fn project_over_sqlite_by_identity() {
    let source = contacts_db();
    let schema = ContactsSchema::default();
    let access = ContactsAccess::read_only();
    let projection = Projection::new(&source, &access, &schema).unwrap();

    let wanted: HashSet<Uid> = [uid("alice")].into_iter().collect();
    let records = projection
        .project(Some(&wanted), &["vcard", "photo", "affinity"])
        .unwrap();
    assert_eq!(records.len(), 1);
    let alice = &records[&uid("alice")];
    assert_eq!(alice.get("photo"), Some(&ColumnValue::Blob(vec![1, 2])));
    assert_eq!(alice.get("affinity"), Some(&ColumnValue::Float(0.25)));
    assert!(alice
        .get("vcard")
        .and_then(ColumnValue::as_text)
        .is_some_and(|v| v.contains("FN:Alice")));
}

#[test]
fn file_backed_source_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.db");
    {
        let source = SqliteSource::open(&path).unwrap();
        source
            .execute_batch(
                "CREATE TABLE contacts (lookup TEXT, contact_last_updated_timestamp INTEGER);
                 INSERT INTO contacts VALUES ('carol', 7);",
            )
            .unwrap();
    }

    let source = SqliteSource::open(&path).unwrap();
    let schema = ContactsSchema::default();
    let access = ContactsAccess::read_only();
    let projection = Projection::new(&source, &access, &schema).unwrap();
    assert_eq!(projection.manifest(None).unwrap().get(&uid("carol")), Some(7));
}

#[test]
fn non_utf8_lookup_is_skipped_in_manifest_and_projection() {
    init_tracing();
    let source = SqliteSource::open_in_memory().unwrap();
    source
        .execute_batch(
            "CREATE TABLE contacts (lookup TEXT, contact_last_updated_timestamp INTEGER, vcard TEXT);
             INSERT INTO contacts VALUES (CAST(X'61FF62' AS TEXT), 10, 'BEGIN:VCARD');
             INSERT INTO contacts VALUES ('ok', 20, 'BEGIN:VCARD');",
        )
        .unwrap();
    let schema = ContactsSchema::default();
    let access = ContactsAccess::read_only();
    let projection = Projection::new(&source, &access, &schema).unwrap();

    let manifest = projection.manifest(None).unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest.get(&uid("ok")), Some(20));

    let ids: HashSet<Uid> = manifest.uids().cloned().collect();
    let records = projection.project(Some(&ids), &["vcard"]).unwrap();
    assert_eq!(records.len(), manifest.len());
}

#[test]
fn non_utf8_text_cell_reads_as_absent() {
    let source = SqliteSource::open_in_memory().unwrap();
    source
        .execute_batch(
            "CREATE TABLE contacts (lookup TEXT);
             INSERT INTO contacts VALUES (CAST(X'FF' AS TEXT));",
        )
        .unwrap();
    let query = Query::new("contacts", vec!["lookup".into()]);
    let mut value = None;
    source
        .scan(&query, &mut |row| {
            value = Some(row.get_typed("lookup", ColumnType::Text));
            ControlFlow::Break(())
        })
        .unwrap();
    assert_eq!(value, Some(ColumnValue::Absent));
}
