#![allow(dead_code)]

use contactsync::{ContactsConfig, ContactsProvider};
use contactsync_source::{ContactsAccess, ContactsSchema, MemoryRow, MemorySource};
use contactsync_types::{DeviceId, Uid};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn uid(s: &str) -> Uid {
    Uid::parse(s).unwrap()
}

pub fn device() -> DeviceId {
    DeviceId::parse("phone1").unwrap()
}

pub fn config() -> ContactsConfig {
    ContactsConfig::new(device())
}

pub fn vcard(name: &str) -> String {
    format!("BEGIN:VCARD\nVERSION:2.1\nFN:{name}\nEND:VCARD\n")
}

pub fn contact_row(schema: &ContactsSchema, lookup: &str, ts: i64, vcard: &str) -> MemoryRow {
    MemoryRow::new()
        .text(&schema.lookup_column, lookup)
        .integer(&schema.timestamp_column, ts)
        .text(&schema.vcard_column, vcard)
}

/// alice at 100, bob at 200 (merged from two rows).
pub fn sample_source() -> MemorySource {
    let schema = ContactsSchema::default();
    MemorySource::new()
        .with_row(&schema.table, contact_row(&schema, "alice", 100, &vcard("Alice")))
        .with_row(&schema.table, contact_row(&schema, "bob", 150, &vcard("Bob")))
        .with_row(&schema.table, contact_row(&schema, "bob", 200, &vcard("Robert")))
}

pub fn provider(source: MemorySource) -> ContactsProvider {
    ContactsProvider::new(Arc::new(source), ContactsAccess::read_only(), config())
}
