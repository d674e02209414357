//! Tabular contact sources and typed column projection.
//!
//! The contact book lives in a store the sync core does not control. This
//! crate reads it through a narrow seam:
//!
//! - [`TabularSource`] / [`Row`]: scan a named table, one row at a time,
//!   with the iteration resource scoped to the call
//! - [`identity_of`]: resolve a row to the [`Uid`](contactsync_types::Uid)
//!   of its logical contact
//! - [`Projection`]: capability-checked typed extraction of per-identity
//!   records, manifests and phone lookups
//!
//! Two sources ship with the crate: [`SqliteSource`] for on-disk contact
//! databases and [`MemorySource`] for tests and embedders.
//!
//! # Example
//!
//! ```
//! use contactsync_source::{ContactsAccess, ContactsSchema, MemoryRow, MemorySource, Projection};
//!
//! let schema = ContactsSchema::default();
//! let source = MemorySource::new().with_row(
//!     &schema.table,
//!     MemoryRow::new()
//!         .text(&schema.lookup_column, "alice")
//!         .integer(&schema.timestamp_column, 100),
//! );
//!
//! let access = ContactsAccess::read_only();
//! let projection = Projection::new(&source, &access, &schema).unwrap();
//! let manifest = projection.manifest(None).unwrap();
//! assert_eq!(manifest.len(), 1);
//! ```

mod access;
mod error;
mod identity;
mod lookup;
mod memory;
mod projection;
mod schema;
mod source;
mod sqlite;

pub use access::{ContactsAccess, Permission};
pub use error::{SourceError, SourceResult};
pub use identity::identity_of;
pub use lookup::{normalize_number, PhoneLookup, Photo};
pub use memory::{MemoryRow, MemorySource};
pub use projection::{read_cell, Projection};
pub use schema::ContactsSchema;
pub use source::{Query, Row, Selection, TabularSource};
pub use sqlite::SqliteSource;
