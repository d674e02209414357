//! Shared fixtures for source tests.

#![allow(dead_code)]

use contactsync_source::{ContactsSchema, MemoryRow, MemorySource};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Routes diagnostics to the test output; honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A contacts row with identity, timestamp and vCard text.
pub fn contact_row(schema: &ContactsSchema, lookup: &str, ts: i64, vcard: &str) -> MemoryRow {
    MemoryRow::new()
        .text(&schema.lookup_column, lookup)
        .integer(&schema.timestamp_column, ts)
        .text(&schema.vcard_column, vcard)
}

pub fn vcard(name: &str) -> String {
    format!("BEGIN:VCARD\nVERSION:2.1\nFN:{name}\nEND:VCARD\n")
}

/// Source holding `alice` (one row) and `bob` (a two-row merge group).
pub fn sample_source(schema: &ContactsSchema) -> MemorySource {
    MemorySource::new()
        .with_row(&schema.table, contact_row(schema, "alice", 100, &vcard("Alice")))
        .with_row(&schema.table, contact_row(schema, "bob", 150, &vcard("Bob")))
        .with_row(&schema.table, contact_row(schema, "bob", 200, &vcard("Robert")))
}
