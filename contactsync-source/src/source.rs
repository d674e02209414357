//! The tabular source seam.
//!
//! A source exposes named tables of rows. Each scan acquires whatever
//! iteration resource the backend needs (a statement, a cursor, a lock),
//! drives the visitor over the rows and releases the resource before it
//! returns, on every exit path. No resource is held across two scans.

use crate::error::SourceResult;
use contactsync_types::{ColumnType, ColumnValue};
use std::ops::ControlFlow;

/// One row of a scan. Only valid for the duration of the visitor call.
pub trait Row {
    /// Native type tag of `column`, or `None` if the row has no such column.
    fn column_type(&self, column: &str) -> Option<ColumnType>;

    /// Reads `column` as `ty`. Returns [`ColumnValue::Absent`] if the column
    /// is missing or does not hold a value of that type.
    fn get_typed(&self, column: &str, ty: ColumnType) -> ColumnValue;
}

/// Restricts a scan to rows whose `column` renders as one of `values`.
///
/// Backends may apply it natively or ignore it; callers filter again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub column: String,
    pub values: Vec<String>,
}

impl Selection {
    pub fn any_of(column: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            column: column.into(),
            values,
        }
    }
}

/// What to read from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    pub columns: Vec<String>,
    pub selection: Option<Selection>,
}

impl Query {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            selection: None,
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// A read-only tabular data source.
///
/// Implementations must be safe to call from several threads at once; a
/// backend that is not serializes access internally.
pub trait TabularSource: Send + Sync {
    /// Scans `query.table`, calling `visit` once per row until the rows are
    /// exhausted or `visit` breaks.
    ///
    /// Requested columns the table does not have are simply missing from
    /// the rows. An unknown table is an error.
    fn scan(
        &self,
        query: &Query,
        visit: &mut dyn FnMut(&dyn Row) -> ControlFlow<()>,
    ) -> SourceResult<()>;
}
