//! Typed row projection.
//!
//! Turns the rows of a contact table into per-identity [`Record`]s without
//! knowing the table's schema in advance. Each cell is read according to
//! the type tag the source reports for it. A row without a usable identity
//! or a cell with an unknown tag is logged and skipped; it never fails the
//! whole projection.

use crate::access::{ContactsAccess, Permission};
use crate::error::{SourceError, SourceResult};
use crate::identity::identity_of;
use crate::schema::ContactsSchema;
use crate::source::{Query, Row, Selection, TabularSource};
use contactsync_types::{ColumnType, ColumnValue, Manifest, Record, Uid};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::ControlFlow;
use tracing::{debug, warn};

/// Reads one cell of `row` according to its native type tag.
///
/// Missing columns and null cells read as [`ColumnValue::Absent`]. An
/// unrecognized tag is reported as [`SourceError::UnsupportedType`].
pub fn read_cell(row: &dyn Row, column: &str) -> SourceResult<ColumnValue> {
    match row.column_type(column) {
        None | Some(ColumnType::Null) => Ok(ColumnValue::Absent),
        Some(ColumnType::Unrecognized(code)) => Err(SourceError::UnsupportedType {
            column: column.to_string(),
            tag: ColumnType::Unrecognized(code),
        }),
        Some(ty) => Ok(row.get_typed(column, ty)),
    }
}

/// Reads `columns` of `row` into a record, skipping cells that fail.
fn read_record(row: &dyn Row, columns: &[&str], uid: &Uid) -> Record {
    let mut record = Record::new();
    for column in columns {
        match read_cell(row, column) {
            Ok(value) => record.set(*column, value),
            Err(e) => warn!("Skipping cell of contact {}: {}", uid, e),
        }
    }
    record
}

/// Interprets a timestamp cell. Integers are taken as-is; text holding an
/// integer is accepted too.
fn timestamp_of(value: &ColumnValue) -> Option<i64> {
    match value {
        ColumnValue::Integer(ts) => Some(*ts),
        ColumnValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A capability-checked view over a contact table.
///
/// Constructing one requires [`Permission::ReadContacts`], so a caller
/// without it fails before any query reaches the source.
pub struct Projection<'a> {
    pub(crate) source: &'a dyn TabularSource,
    pub(crate) schema: &'a ContactsSchema,
}

impl<'a> Projection<'a> {
    pub fn new(
        source: &'a dyn TabularSource,
        access: &ContactsAccess,
        schema: &'a ContactsSchema,
    ) -> SourceResult<Self> {
        access.require(Permission::ReadContacts)?;
        Ok(Self { source, schema })
    }

    pub fn schema(&self) -> &ContactsSchema {
        self.schema
    }

    /// Projects `columns` for every identity in `identities`, or for every
    /// identity in the table when `identities` is `None`.
    ///
    /// When several rows share an identity their records are merged in scan
    /// order, later rows overwriting earlier ones column by column.
    pub fn project(
        &self,
        identities: Option<&HashSet<Uid>>,
        columns: &[&str],
    ) -> SourceResult<HashMap<Uid, Record>> {
        let mut records: HashMap<Uid, Record> = HashMap::new();
        self.for_each_row(identities, columns, |uid, record| {
            records.entry(uid).or_default().overlay(record);
        })?;
        debug!(
            "Projected {} column(s) for {} contact(s)",
            columns.len(),
            records.len()
        );
        Ok(records)
    }

    /// Builds the identity to last-modified manifest.
    ///
    /// An identity backed by several rows reports the largest timestamp of
    /// its rows. Rows without a readable timestamp are left out.
    pub fn manifest(&self, identities: Option<&HashSet<Uid>>) -> SourceResult<Manifest> {
        let timestamp_column = self.schema.timestamp_column.as_str();
        let mut manifest = Manifest::new();
        self.for_each_row(identities, &[timestamp_column], |uid, record| {
            match record.get(timestamp_column).and_then(timestamp_of) {
                Some(ts) => manifest.observe(uid, ts),
                None => warn!(
                    "Contact {} has no usable {} value, leaving it out of the manifest",
                    uid, timestamp_column
                ),
            }
        })?;
        debug!("Built manifest with {} contact(s)", manifest.len());
        Ok(manifest)
    }

    /// Every distinct identity in the table.
    pub fn identities(&self) -> SourceResult<BTreeSet<Uid>> {
        let mut uids = BTreeSet::new();
        self.for_each_row(None, &[], |uid, _| {
            uids.insert(uid);
        })?;
        Ok(uids)
    }

    fn for_each_row(
        &self,
        identities: Option<&HashSet<Uid>>,
        columns: &[&str],
        mut sink: impl FnMut(Uid, Record),
    ) -> SourceResult<()> {
        let lookup = self.schema.lookup_column.as_str();

        let mut query_columns = vec![lookup.to_string()];
        for column in columns {
            if !query_columns.iter().any(|c| c == column) {
                query_columns.push((*column).to_string());
            }
        }
        let mut query = Query::new(&self.schema.table, query_columns);
        if let Some(ids) = identities {
            if ids.is_empty() {
                return Ok(());
            }
            let values = ids.iter().map(|uid| uid.as_str().to_string()).collect();
            query = query.with_selection(Selection::any_of(lookup, values));
        }

        let mut skipped = 0usize;
        self.source.scan(&query, &mut |row| {
            let uid = match identity_of(row, lookup) {
                Ok(uid) => uid,
                Err(e) => {
                    warn!("Skipping contact row without identity: {}", e);
                    skipped += 1;
                    return ControlFlow::Continue(());
                }
            };
            if identities.is_some_and(|ids| !ids.contains(&uid)) {
                return ControlFlow::Continue(());
            }
            let record = read_record(row, columns, &uid);
            sink(uid, record);
            ControlFlow::Continue(())
        })?;

        if skipped > 0 {
            debug!("Skipped {} row(s) of {}", skipped, self.schema.table);
        }
        Ok(())
    }
}
