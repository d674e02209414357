//! In-memory [`TabularSource`] for tests and embedders.
//!
//! Tables are `Vec`s of rows behind a `std::sync::RwLock`. A scan holds the
//! read lock for its duration and releases it when it returns.

use crate::error::{SourceError, SourceResult};
use crate::source::{Query, Row, TabularSource};
use contactsync_types::{ColumnType, ColumnValue};
use std::collections::{BTreeMap, HashMap};
use std::ops::ControlFlow;
use std::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Value(ColumnValue),
    Unrecognized(i32),
}

/// A row of named cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRow {
    cells: BTreeMap<String, Cell>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column` to `value`. `ColumnValue::Absent` stores a null cell.
    pub fn with(mut self, column: impl Into<String>, value: ColumnValue) -> Self {
        self.cells.insert(column.into(), Cell::Value(value));
        self
    }

    pub fn text(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(column, ColumnValue::Text(value.into()))
    }

    pub fn integer(self, column: impl Into<String>, value: i64) -> Self {
        self.with(column, ColumnValue::Integer(value))
    }

    pub fn float(self, column: impl Into<String>, value: f64) -> Self {
        self.with(column, ColumnValue::Float(value))
    }

    pub fn blob(self, column: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.with(column, ColumnValue::Blob(value.into()))
    }

    pub fn null(self, column: impl Into<String>) -> Self {
        self.with(column, ColumnValue::Absent)
    }

    /// Stores a cell whose type tag is `tag`, a code the core does not know.
    pub fn unrecognized(mut self, column: impl Into<String>, tag: i32) -> Self {
        self.cells.insert(column.into(), Cell::Unrecognized(tag));
        self
    }

    /// Value stored for `column`, if any.
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        match self.cells.get(column)? {
            Cell::Value(value) => Some(value),
            Cell::Unrecognized(_) => None,
        }
    }

    fn rendered(&self, column: &str) -> Option<String> {
        match self.cells.get(column)? {
            Cell::Value(ColumnValue::Text(s)) => Some(s.clone()),
            Cell::Value(ColumnValue::Integer(i)) => Some(i.to_string()),
            _ => None,
        }
    }
}

/// Restricts a stored row to the columns a query asked for.
struct ProjectedRow<'a> {
    row: &'a MemoryRow,
    columns: &'a [String],
}

impl ProjectedRow<'_> {
    fn cell(&self, column: &str) -> Option<&Cell> {
        if !self.columns.iter().any(|c| c == column) {
            return None;
        }
        self.row.cells.get(column)
    }
}

impl Row for ProjectedRow<'_> {
    fn column_type(&self, column: &str) -> Option<ColumnType> {
        match self.cell(column)? {
            Cell::Value(value) => Some(value.column_type()),
            Cell::Unrecognized(tag) => Some(ColumnType::Unrecognized(*tag)),
        }
    }

    fn get_typed(&self, column: &str, ty: ColumnType) -> ColumnValue {
        match self.cell(column) {
            Some(Cell::Value(value)) if value.column_type() == ty => value.clone(),
            _ => ColumnValue::Absent,
        }
    }
}

/// A set of named in-memory tables.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: RwLock<HashMap<String, Vec<MemoryRow>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemorySource::insert`]. If the lock is poisoned
    /// the row is dropped with a warning.
    pub fn with_row(self, table: &str, row: MemoryRow) -> Self {
        if let Err(e) = self.insert(table, row) {
            warn!("Dropping row for {}: {}", table, e);
        }
        self
    }

    /// Appends a row to `table`, creating the table if needed.
    pub fn insert(&self, table: &str, row: MemoryRow) -> SourceResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| SourceError::Query("memory source lock poisoned".into()))?;
        tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    /// Creates `table` with no rows.
    pub fn create_table(&self, table: &str) -> SourceResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| SourceError::Query("memory source lock poisoned".into()))?;
        tables.entry(table.to_string()).or_default();
        Ok(())
    }

    /// Removes every row of `table` for which `predicate` holds.
    pub fn remove_where(
        &self,
        table: &str,
        predicate: impl Fn(&MemoryRow) -> bool,
    ) -> SourceResult<usize> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| SourceError::Query("memory source lock poisoned".into()))?;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !predicate(row));
        Ok(before - rows.len())
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl TabularSource for MemorySource {
    fn scan(
        &self,
        query: &Query,
        visit: &mut dyn FnMut(&dyn Row) -> ControlFlow<()>,
    ) -> SourceResult<()> {
        let tables = self
            .tables
            .read()
            .map_err(|_| SourceError::Query("memory source lock poisoned".into()))?;
        let rows = tables
            .get(&query.table)
            .ok_or_else(|| SourceError::Query(format!("no such table: {}", query.table)))?;

        for row in rows {
            if let Some(selection) = &query.selection {
                let matches = row
                    .rendered(&selection.column)
                    .is_some_and(|v| selection.values.contains(&v));
                if !matches {
                    continue;
                }
            }
            let projected = ProjectedRow {
                row,
                columns: &query.columns,
            };
            if visit(&projected).is_break() {
                break;
            }
        }
        Ok(())
    }
}
